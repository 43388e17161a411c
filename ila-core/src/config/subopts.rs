use std::collections::HashMap;

use crate::error::{IlaError, IlaResult};

/// Parses a `key=value[,key=value...]` sub-option string, the shape used
/// by every `-D`/`-R`/`-A`-style CLI flag.
pub fn parse_subopts(input: &str) -> IlaResult<HashMap<String, String>> {
    let mut out = HashMap::new();
    if input.is_empty() {
        return Ok(out);
    }
    for pair in input.split(',') {
        let (key, value) = pair
            .split_once('=')
            .ok_or_else(|| IlaError::Config(format!("malformed sub-option {pair:?}, expected key=value")))?;
        out.insert(key.to_string(), value.to_string());
    }
    Ok(out)
}

/// Looks up a required key, with a config error naming which flag it
/// came from if absent.
pub fn require<'a>(opts: &'a HashMap<String, String>, key: &str, flag: &str) -> IlaResult<&'a str> {
    opts.get(key)
        .map(String::as_str)
        .ok_or_else(|| IlaError::Config(format!("{flag}: missing required sub-option {key:?}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_multiple_pairs() {
        let parsed = parse_subopts("host=::1,port=6379").unwrap();
        assert_eq!(parsed.get("host").unwrap(), "::1");
        assert_eq!(parsed.get("port").unwrap(), "6379");
    }

    #[test]
    fn rejects_pair_without_equals() {
        assert!(parse_subopts("host").is_err());
    }

    #[test]
    fn empty_string_yields_empty_map() {
        assert!(parse_subopts("").unwrap().is_empty());
    }
}
