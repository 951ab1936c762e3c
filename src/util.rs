use crate::KeyMethod;
use log::info;

pub fn parse_key_method(input: &str) -> KeyMethod {
    match input.to_lowercase().as_str() {
        "a" | "aarden" | "essen" | "aarden-essen" => KeyMethod::AardenEssen,
        "k" | "krumhansl" | "kessler" | "krumhansl-kessler" => KeyMethod::KrumhanslKessler,
        other => {
            info!("Unknown key method '{}', defaulting to `aarden`..!", other);
            KeyMethod::AardenEssen
        }
    }
}

/// Drop a `data:...;base64,` style header: everything up to and including the first comma.
pub fn strip_data_url_header(input: &str) -> &str {
    match input.split_once(',') {
        Some((_header, payload)) => payload,
        None => input,
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn key_method_aliases() {
        assert_eq!(parse_key_method("Krumhansl"), KeyMethod::KrumhanslKessler);
        assert_eq!(parse_key_method("AARDEN"), KeyMethod::AardenEssen);
        assert_eq!(parse_key_method("temperley"), KeyMethod::AardenEssen);
    }

    #[test]
    fn data_url_header_is_stripped_at_first_comma() {
        assert_eq!(
            strip_data_url_header("data:audio/midi;base64,TVRoZA=="),
            "TVRoZA=="
        );
        assert_eq!(strip_data_url_header("TVRoZA=="), "TVRoZA==");
        assert_eq!(strip_data_url_header("a,b,c"), "b,c");
    }
}
