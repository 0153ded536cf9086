#![allow(non_snake_case)]

// Базовые модули
pub mod consts;
pub mod config;
pub mod lock;
pub mod util;

// Хранилище вложенных бакетов (журнал + in-memory дерево)
pub mod store;  // src/store/{mod,node,ops,journal,tx}.rs

// Компактирующее копирование: snapshot → replay
pub mod copy;   // src/copy/{mod,tree,path,snapshot,replay,dest,error}.rs

// CLI `nestcopy`
pub mod cli;

// Удобные реэкспорты
pub use config::{CopyBuilder, CopyConfig};
pub use copy::{copy_store, Container, ContainerPath, CopyError, CopyReport, Entry};
pub use store::{Store, StoreOptions, StoreStats};
