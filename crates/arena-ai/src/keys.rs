//! 제공자별 API 키.

use arena_core::ProviderKind;
use secrecy::{ExposeSecret, SecretString};
use serde::Serialize;
use std::collections::HashMap;

/// 이보다 짧은 키는 잘못된 형식으로 봅니다.
const MIN_KEY_LEN: usize = 20;

/// API 키 상태.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum KeyStatus {
    Missing,
    Malformed,
    Present,
}

impl KeyStatus {
    /// 키 문자열의 형식을 검사합니다.
    pub fn classify(raw: &str) -> Self {
        if raw.is_empty() {
            KeyStatus::Missing
        } else if raw.len() < MIN_KEY_LEN || raw.chars().any(char::is_whitespace) {
            KeyStatus::Malformed
        } else {
            KeyStatus::Present
        }
    }

    pub fn is_present(&self) -> bool {
        matches!(self, KeyStatus::Present)
    }
}

/// 제공자별 API 키 묶음.
///
/// 키 값은 `SecretString`으로 보관되어 Debug 출력에 노출되지 않습니다.
#[derive(Debug, Clone, Default)]
pub struct ApiKeys {
    keys: HashMap<ProviderKind, SecretString>,
}

impl ApiKeys {
    pub fn new() -> Self {
        Self::default()
    }

    /// 환경 변수에서 모든 제공자의 키를 읽습니다.
    pub fn from_env() -> Self {
        let mut keys = Self::new();
        for kind in ProviderKind::ALL {
            let value = std::env::var(kind.api_key_env()).ok().or_else(|| {
                kind.api_key_fallback_env()
                    .and_then(|name| std::env::var(name).ok())
            });
            if let Some(value) = value {
                keys = keys.with_key(kind, value);
            }
        }
        keys
    }

    /// 키를 설정합니다. 앞뒤 공백은 제거하지 않습니다.
    pub fn with_key(mut self, kind: ProviderKind, key: impl Into<String>) -> Self {
        self.keys.insert(kind, SecretString::from(key.into()));
        self
    }

    /// 키 상태를 확인합니다.
    pub fn status(&self, kind: ProviderKind) -> KeyStatus {
        self.keys
            .get(&kind)
            .map(|k| KeyStatus::classify(k.expose_secret()))
            .unwrap_or(KeyStatus::Missing)
    }

    /// 사용 가능한 키만 반환합니다.
    pub fn get(&self, kind: ProviderKind) -> Option<&SecretString> {
        if self.status(kind).is_present() {
            self.keys.get(&kind)
        } else {
            None
        }
    }

    /// 사용 가능한 키가 있는 제공자 목록.
    pub fn configured(&self) -> Vec<ProviderKind> {
        ProviderKind::ALL
            .into_iter()
            .filter(|k| self.status(*k).is_present())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify() {
        assert_eq!(KeyStatus::classify(""), KeyStatus::Missing);
        assert_eq!(KeyStatus::classify("short"), KeyStatus::Malformed);
        assert_eq!(
            KeyStatus::classify("sk-abcdefghij klmnopqrstuv"),
            KeyStatus::Malformed
        );
        assert_eq!(
            KeyStatus::classify("sk-abcdefghijklmnopqrstuvwxyz"),
            KeyStatus::Present
        );
    }

    #[test]
    fn test_status_and_get() {
        let keys = ApiKeys::new()
            .with_key(ProviderKind::OpenAi, "sk-abcdefghijklmnopqrstuvwxyz")
            .with_key(ProviderKind::Grok, "bad key");

        assert_eq!(keys.status(ProviderKind::OpenAi), KeyStatus::Present);
        assert_eq!(keys.status(ProviderKind::Grok), KeyStatus::Malformed);
        assert_eq!(keys.status(ProviderKind::Gemini), KeyStatus::Missing);
        assert!(keys.get(ProviderKind::Grok).is_none());
        assert!(keys.get(ProviderKind::OpenAi).is_some());
        assert_eq!(keys.configured(), vec![ProviderKind::OpenAi]);
    }

    #[test]
    fn test_debug_does_not_leak() {
        let keys = ApiKeys::new().with_key(ProviderKind::Anthropic, "sk-ant-secret-value-123456");
        assert!(!format!("{keys:?}").contains("secret-value"));
    }
}
