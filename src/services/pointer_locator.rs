use crate::error::{WatcherError, Result};
use tokio::process::Command;
use tracing::debug;

/// Текущая позиция указателя
#[async_trait::async_trait]
pub trait PointerPosition: Send + Sync {
    async fn pointer_position(&self) -> (f64, f64);
}

/// Позиция указателя через xdotool
pub struct PointerLocator;

impl Default for PointerLocator {
    fn default() -> Self {
        Self::new()
    }
}

impl PointerLocator {
    pub fn new() -> Self {
        Self
    }

    pub async fn position(&self) -> Result<(i32, i32)> {
        let output = Command::new("xdotool")
            .args(["getmouselocation", "--shell"])
            .output()
            .await
            .map_err(|e| {
                debug!("xdotool не найден или не работает: {}", e);
                WatcherError::Internal(format!("xdotool не найден: {}", e))
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            debug!("xdotool вернул ошибку: {}", stderr);
            return Err(WatcherError::Internal(format!("xdotool вернул ошибку: {}", stderr)));
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        parse_mouse_location(&stdout).ok_or_else(|| {
            WatcherError::Internal(format!("Непонятный вывод xdotool: '{}'", stdout.trim()))
        })
    }

    /// Позиция или (0, 0), если определить не удалось
    pub async fn position_or_origin(&self) -> (i32, i32) {
        match self.position().await {
            Ok(position) => position,
            Err(e) => {
                debug!("Позиция указателя недоступна: {}", e);
                (0, 0)
            }
        }
    }
}

#[async_trait::async_trait]
impl PointerPosition for PointerLocator {
    async fn pointer_position(&self) -> (f64, f64) {
        let (x, y) = self.position_or_origin().await;
        (f64::from(x), f64::from(y))
    }
}

/// Разбор `xdotool getmouselocation --shell`: строки вида X=..., Y=...
fn parse_mouse_location(output: &str) -> Option<(i32, i32)> {
    let mut x = None;
    let mut y = None;
    for line in output.lines() {
        match line.trim().split_once('=') {
            Some(("X", value)) => x = value.parse().ok(),
            Some(("Y", value)) => y = value.parse().ok(),
            _ => {}
        }
    }
    Some((x?, y?))
}
