use std::time::Duration;

use port_sweep::report::{generate_report, save_csv, save_report};
use port_sweep::types::{HostReport, PortInfo, ScanStatus};

fn windows_box() -> HostReport {
    HostReport {
        host: "192.168.1.20".into(),
        ports: vec![
            PortInfo { port: 445, service: "SMB".into(), banner: String::new() },
            PortInfo { port: 3389, service: "RDP".into(), banner: String::new() },
        ],
        os_guess: "Likely Windows".into(),
        status: ScanStatus::Completed,
        timestamp: "2024-05-01T12:00:00Z".into(),
        duration_ms: 900,
    }
}

#[test]
fn csv_and_report_land_on_disk() {
    let dir = tempfile::tempdir().unwrap();
    let csv_path = dir.path().join("scan.csv");
    let txt_path = dir.path().join("scan.txt");

    save_csv(&csv_path, &[windows_box()]).unwrap();
    let csv = std::fs::read_to_string(&csv_path).unwrap();
    assert!(csv.starts_with("Host,Port,Service,Timestamp"));
    assert!(csv.contains("192.168.1.20,3389,RDP,"));

    let text = generate_report(&[windows_box()], Duration::from_secs(65));
    save_report(&txt_path, &text).unwrap();
    let read_back = std::fs::read_to_string(&txt_path).unwrap();
    assert!(read_back.contains("Duration: 1m 5s"));
    assert!(read_back.contains("OS Detection: Likely Windows"));
}

#[test]
fn empty_host_section() {
    let mut r = windows_box();
    r.ports.clear();
    let text = generate_report(&[r], Duration::from_secs(1));
    assert!(text.contains("No open ports found"));
    assert!(!text.contains("OS Detection"));
}
