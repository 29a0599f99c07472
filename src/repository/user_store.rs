//! User store (凭证存储协作方)
//! 按用户名查找用户，本模块不做重试与缓存

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;

use crate::models::Principal;

/// 存储层故障
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("user store unavailable: {0}")]
    Unavailable(String),
}

/// 凭证存储接口
#[async_trait]
pub trait UserStore: Send + Sync {
    /// 根据用户名查找用户，不存在时返回 `Ok(None)`
    async fn find_by_username(&self, username: &str)
        -> Result<Option<Arc<dyn Principal>>, StoreError>;
}

/// 内存用户存储
///
/// 启动时写入，之后只读。
#[derive(Debug, Default)]
pub struct InMemoryUserStore {
    users: HashMap<String, Arc<dyn Principal>>,
}

impl InMemoryUserStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// 写入用户，同名用户会被覆盖
    pub fn insert(&mut self, principal: Arc<dyn Principal>) -> &mut Self {
        self.users.insert(principal.username().to_string(), principal);
        self
    }

    pub fn len(&self) -> usize {
        self.users.len()
    }

    pub fn is_empty(&self) -> bool {
        self.users.is_empty()
    }
}

#[async_trait]
impl UserStore for InMemoryUserStore {
    async fn find_by_username(
        &self,
        username: &str,
    ) -> Result<Option<Arc<dyn Principal>>, StoreError> {
        Ok(self.users.get(username).cloned())
    }
}

/// 空存储，任何查找都返回未找到（build 环境使用）
#[derive(Debug, Default, Clone, Copy)]
pub struct EmptyUserStore;

#[async_trait]
impl UserStore for EmptyUserStore {
    async fn find_by_username(
        &self,
        _username: &str,
    ) -> Result<Option<Arc<dyn Principal>>, StoreError> {
        Ok(None)
    }
}
