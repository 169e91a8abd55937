//! 账户仓储层
//!
//! 提供账户余额的数据访问抽象，以及 PostgreSQL 与进程内两种实现。

mod account_repo;
mod memory;
mod traits;

pub use account_repo::AccountRepository;
pub use memory::InMemoryAccountRepository;
pub use traits::AccountRepositoryTrait;

#[cfg(test)]
pub use traits::MockAccountRepositoryTrait;
