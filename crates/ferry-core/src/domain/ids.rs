//! Queue item identifiers.
//!
//! # 形式
//! `{KIND_TAG}_{ULID}` 例: `SUBMIT_QUIZ_RESULT_01HZX3Q7T4M2W8D9K6J5R0B1CN`
//!
//! - ULID の先頭 48 bit が生成時刻、残り 80 bit が乱数
//! - kind のタグを前置するので、ログだけで種類が分かる
//!
//! Ids are opaque to everything except the generator. Records written by older
//! clients (`{TAG}_{millis}_{random}`) deserialize just as well.

use serde::{Deserialize, Serialize};
use std::fmt;
use ulid::Ulid;

use super::kind::SyncKind;

/// Identifier of a queued item. Generated at enqueue time, never supplied by callers.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ItemId(String);

impl ItemId {
    pub fn from_parts(kind: SyncKind, ulid: Ulid) -> Self {
        Self(format!("{}_{}", kind.tag(), ulid))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for ItemId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for ItemId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl fmt::Display for ItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn id_is_prefixed_with_kind_tag() {
        let ulid = Ulid::new();
        let id = ItemId::from_parts(SyncKind::GameResult, ulid);
        assert_eq!(id.as_str(), format!("SUBMIT_GAME_RESULT_{ulid}"));
    }

    #[test]
    fn legacy_ids_are_accepted() {
        let id: ItemId = serde_json::from_str("\"GENERIC_SYNC_1700000000000_k3j9x0a1q\"").unwrap();
        assert_eq!(id.to_string(), "GENERIC_SYNC_1700000000000_k3j9x0a1q");
    }
}
