use crate::error::{AppError, AppResult};
use regex::Regex;

/// 验证 E.164 国际手机号格式 (如 +911234567890)
pub fn validate_phone(phone: &str) -> AppResult<()> {
    let phone_regex = Regex::new(r"^\+[1-9]\d{7,14}$").unwrap();

    if !phone_regex.is_match(phone) {
        return Err(AppError::ValidationError(
            "Invalid phone number, expected E.164 format (e.g. +911234567890)".to_string(),
        ));
    }

    Ok(())
}

/// 去掉手机号中的空格、括号与连字符
pub fn normalize_phone(phone: &str) -> String {
    phone
        .chars()
        .filter(|c| c.is_ascii_digit() || *c == '+')
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_phone() {
        assert!(validate_phone("+911234567890").is_ok());
        assert!(validate_phone("+12345678901").is_ok());
        assert!(validate_phone("+8613812345678").is_ok());
        assert!(validate_phone("911234567890").is_err());
        assert!(validate_phone("+0123456789").is_err());
        assert!(validate_phone("+12").is_err());
        assert!(validate_phone("").is_err());
    }

    #[test]
    fn test_normalize_phone() {
        assert_eq!(normalize_phone("+91 12345 67890"), "+911234567890");
        assert_eq!(normalize_phone("(234) 567-8901"), "2345678901");
        assert_eq!(normalize_phone("+911234567890"), "+911234567890");
    }
}
