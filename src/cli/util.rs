pub(crate) fn mask_api_key(key: &str) -> String {
    if key.is_empty() {
        return "(not set)".to_string();
    }

    // at most half the key, never all of it
    let visible = (key.chars().count() / 2).min(8);
    let prefix: String = key.chars().take(visible).collect();
    format!("{prefix}***")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn masks_all_but_the_prefix() {
        assert_eq!(mask_api_key("sk-or-v1-abcdef123456"), "sk-or-v1***");
        assert_eq!(mask_api_key("abc"), "a***");
        assert_eq!(mask_api_key("x"), "***");
        assert_eq!(mask_api_key(""), "(not set)");
    }
}
