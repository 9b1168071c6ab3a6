/// Formats `buffer[start..=end]` as 16-byte rows of hex plus printable ASCII.
pub fn hexdump(buffer: &[u8], start: u16, end: u16) -> String {
    let mut str = String::new();
    if buffer.is_empty() {
        return str;
    }

    let mut addr = start as usize;
    let end = (end as usize).min(buffer.len().saturating_sub(1));

    while addr <= end {
        let mut line = format!("{:04x}: ", addr);
        let mut chars = String::new();
        for _ in 0..16 {
            if addr > end {
                break;
            }
            let byte = buffer[addr];
            line.push_str(&format!("{:02x} ", byte));
            let c = byte as char;
            chars.push(if c.is_ascii_graphic() || c == ' ' {
                c
            } else {
                '.'
            });
            addr += 1;
        }

        str.push_str(&format!("{:<54} {}\n", line, chars));
    }

    str
}
