use anyhow::{bail, Context, Result};

/// Parse a port range argument into an inclusive `(start, end)` pair.
///
/// Supported forms:
/// - single port: `80`
/// - inclusive range: `1-1024`
/// - surrounding whitespace is ignored
pub fn parse_port_range(s: &str) -> Result<(u16, u16)> {
    let s = s.trim();
    if let Some((a, b)) = s.split_once('-') {
        let start = parse_port_str(a.trim())
            .with_context(|| format!("invalid start in range: {a}"))?;
        let end =
            parse_port_str(b.trim()).with_context(|| format!("invalid end in range: {b}"))?;
        if start > end {
            bail!("invalid range {start}-{end} (start > end)");
        }
        return Ok((start, end));
    }
    let p = parse_port_str(s).with_context(|| format!("invalid port value: {s}"))?;
    Ok((p, p))
}

/// Parse one TCP port number (1..=65535).
pub fn parse_port_str(s: &str) -> Result<u16> {
    let val: u32 = s.parse::<u32>().map_err(|e| anyhow::anyhow!(e))?;
    if val == 0 || val > 65535 {
        bail!("port out of range: {val}");
    }
    Ok(val as u16)
}
