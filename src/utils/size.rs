use bytesize::ByteSize;

/// Parse a byte size such as `20GiB`, `512 MB` or a plain number of bytes.
pub fn parse_size(input: &str) -> Result<u64, String> {
    let input = input.trim();
    if input.is_empty() {
        return Err("empty size".to_string());
    }
    if let Ok(bytes) = input.parse::<u64>() {
        return Ok(bytes);
    }
    input
        .parse::<ByteSize>()
        .map(|size| size.as_u64())
        .map_err(|e| format!("invalid size '{}': {}", input, e))
}

/// Human readable size with binary units.
pub fn format_size(bytes: u64) -> String {
    ByteSize::b(bytes).to_string()
}

pub fn gib(n: u64) -> u64 {
    ByteSize::gib(n).as_u64()
}
