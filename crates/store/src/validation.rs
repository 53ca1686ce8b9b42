//! 标识符校验
//!
//! nonce / fingerprint / token 在进入任何查询之前都必须通过这里。

use crate::error::{StoreError, StoreResult};

/// 非空且仅包含 `0-9a-f`
pub fn is_valid_hex(s: &str) -> bool {
    !s.is_empty() && s.bytes().all(|b| matches!(b, b'0'..=b'9' | b'a'..=b'f'))
}

pub(crate) fn require_hex(field: &'static str, value: &str) -> StoreResult<()> {
    if is_valid_hex(value) {
        Ok(())
    } else {
        Err(StoreError::InvalidInput { field })
    }
}
