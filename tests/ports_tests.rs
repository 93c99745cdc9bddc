use port_sweep::ports::parse_port_range;
use port_sweep::ScanConfig;

#[test]
fn parse_range_feeds_config() {
    let (start, end) = parse_port_range("20-25").expect("parse ok");
    let cfg = ScanConfig::builder("127.0.0.1")
        .ports(start, end)
        .build()
        .expect("valid config");
    assert_eq!(cfg.port_count(), 6);
}

#[test]
fn full_port_space_accepted() {
    assert_eq!(parse_port_range("1-65535").unwrap(), (1, 65535));
}

#[test]
fn invalid_port_rejected() {
    assert!(parse_port_range("0").is_err());
    assert!(parse_port_range("10-").is_err());
}
