/// Well-known TCP ports and their service names.
const COMMON_PORTS: &[(u16, &str)] = &[
    (20, "FTP Data"),
    (21, "FTP Control"),
    (22, "SSH"),
    (23, "Telnet"),
    (25, "SMTP"),
    (53, "DNS"),
    (80, "HTTP"),
    (110, "POP3"),
    (115, "SFTP"),
    (143, "IMAP"),
    (194, "IRC"),
    (443, "HTTPS"),
    (445, "SMB"),
    (1433, "MSSQL"),
    (3306, "MySQL"),
    (3389, "RDP"),
    (5432, "PostgreSQL"),
    (5900, "VNC"),
    (8080, "HTTP-Alt"),
    (27017, "MongoDB"),
];

/// Static service name for `port`, or `"Unknown"`.
pub fn service_name(port: u16) -> &'static str {
    COMMON_PORTS
        .iter()
        .find(|(p, _)| *p == port)
        .map(|(_, name)| *name)
        .unwrap_or("Unknown")
}

/// Coarse OS label from a handful of signature ports.
pub fn guess_os(open_ports: &[u16]) -> &'static str {
    let has = |p: u16| open_ports.contains(&p);

    if has(445) || has(3389) || has(135) {
        "Likely Windows"
    } else if has(22) && has(111) {
        "Likely Linux/Unix"
    } else if has(22) {
        "Likely Linux/Unix or Network Device"
    } else if has(80) || has(443) {
        "Likely Network Device or Appliance"
    } else {
        "Unknown OS"
    }
}
