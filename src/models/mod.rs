//! 数据模型模块
//! 用户能力集、按类型标识解码的注册表，以及认证相关的请求/响应模型

pub mod auth;
pub mod principal;
pub mod registry;
pub mod user;

pub use principal::{Principal, PrincipalId};
pub use registry::{DecodeFn, PrincipalTypeRegistry, TYPE_FIELD};
pub use user::{StandardUser, STANDARD_USER_TYPE};
