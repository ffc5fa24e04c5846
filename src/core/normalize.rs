/// Turns a resource name into an environment-variable style token.
pub fn normalize(name: &str) -> String {
    name.replace('-', "_").to_uppercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize() {
        assert_eq!(normalize("db"), "DB");
        assert_eq!(normalize("db-cred"), "DB_CRED");
        assert_eq!(normalize("my-pg-primary"), "MY_PG_PRIMARY");
        assert_eq!(normalize("Already_Upper"), "ALREADY_UPPER");
        assert_eq!(normalize(""), "");
    }
}
