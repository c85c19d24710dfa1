//! Наблюдатель выделения текста на рабочем столе.
//!
//! Процесс-наблюдатель обнаруживает выделение (AT-SPI или проба буфера
//! обмена), подавляет дубли и отдаёт события по локальному каналу процессу-
//! презентеру, который показывает всплывающее окно "спросить ИИ".

pub mod channel;
pub mod config;
pub mod constants;
pub mod error;
pub mod events;
pub mod presenter;
pub mod services;
pub mod utils;
