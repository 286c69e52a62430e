use crate::error::AppResult;
use rand::Rng;
use std::future::Future;

/// 优惠码字母表: 大写字母 + 数字, 共36个符号
pub const CODE_ALPHABET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";
/// 优惠码长度 (8位, 约41比特熵)
pub const CODE_LENGTH: usize = 8;
/// 连续碰撞达到该次数后放弃本张券的发放
pub const MAX_CODE_ATTEMPTS: u32 = 10;

/// 生成一个8位字母数字优惠码
pub fn generate_coupon_code() -> String {
    let mut rng = rand::thread_rng();
    (0..CODE_LENGTH)
        .map(|_| CODE_ALPHABET[rng.gen_range(0..CODE_ALPHABET.len())] as char)
        .collect()
}

/// 生成一个未被占用的优惠码。
///
/// `check_exists` 是存在性判断 (通常查询 user_coupons.code)。最多重试
/// [`MAX_CODE_ATTEMPTS`] 次, 全部碰撞时返回 `Ok(None)`, 调用方应跳过
/// 当前券并继续批次, 不得将其升级为整个请求的失败。
///
/// 存在性检查只是优化: 真正防止重复的是数据库的唯一约束, 插入端仍需
/// 处理约束冲突。
pub async fn generate_unique_code<F, Fut>(check_exists: F) -> AppResult<Option<String>>
where
    F: Fn(String) -> Fut,
    Fut: Future<Output = AppResult<bool>>,
{
    for _ in 0..MAX_CODE_ATTEMPTS {
        let code = generate_coupon_code();
        if !check_exists(code.clone()).await? {
            return Ok(Some(code));
        }
    }

    Ok(None)
}

/// 自动生成票号: 前缀 + 6位零填充序号, 如 TICKET000001
pub fn format_ticket_number(prefix: &str, seq: u32) -> String {
    format!("{}{:06}", prefix, seq)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use std::sync::Mutex;

    #[test]
    fn test_generate_coupon_code_shape() {
        for _ in 0..100 {
            let code = generate_coupon_code();
            assert_eq!(code.len(), CODE_LENGTH);
            assert!(
                code.bytes().all(|b| CODE_ALPHABET.contains(&b)),
                "非法字符: {code}"
            );
        }
    }

    #[test]
    fn test_generate_multiple_codes_are_different() {
        // 理论上可能相同, 但100个8位码全碰撞的概率可以忽略
        let codes: HashSet<String> = (0..100).map(|_| generate_coupon_code()).collect();
        assert!(codes.len() > 1);
    }

    #[tokio::test]
    async fn test_unique_code_against_taken_set() {
        let taken: Mutex<HashSet<String>> = Mutex::new(HashSet::new());

        for _ in 0..50 {
            let code = generate_unique_code(|c| {
                let exists = taken.lock().unwrap().contains(&c);
                async move { Ok(exists) }
            })
            .await
            .unwrap()
            .expect("空集合下不应耗尽");

            assert!(taken.lock().unwrap().insert(code));
        }

        assert_eq!(taken.lock().unwrap().len(), 50);
    }

    #[tokio::test]
    async fn test_unique_code_exhausted_when_all_taken() {
        // 全部视作已占用: 10次后放弃
        let attempts = Mutex::new(0u32);
        let result = generate_unique_code(|_| {
            *attempts.lock().unwrap() += 1;
            async { Ok(true) }
        })
        .await
        .unwrap();

        assert!(result.is_none());
        assert_eq!(*attempts.lock().unwrap(), MAX_CODE_ATTEMPTS);
    }

    #[tokio::test]
    async fn test_unique_code_propagates_oracle_error() {
        let result = generate_unique_code(|_| async {
            Err(crate::error::AppError::InternalError("boom".to_string()))
        })
        .await;

        assert!(result.is_err());
    }

    #[test]
    fn test_format_ticket_number() {
        assert_eq!(format_ticket_number("TICKET", 1), "TICKET000001");
        assert_eq!(format_ticket_number("GALA", 42), "GALA000042");
        assert_eq!(format_ticket_number("T", 999999), "T999999");
    }
}
