use tokio::process::Command;
use tracing::debug;

use crate::services::PointerLocator;

/// Точка в экранных координатах
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Point {
    pub x: i32,
    pub y: i32,
}

impl Point {
    pub fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }
}

/// Прямоугольник в целых пикселях (рабочая область, окно)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Bounds {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
}

impl Bounds {
    pub const fn new(x: i32, y: i32, width: i32, height: i32) -> Self {
        Self { x, y, width, height }
    }

    pub fn right(&self) -> i32 {
        self.x + self.width
    }
}

/// Источник геометрии дисплея для презентера
#[async_trait::async_trait]
pub trait GeometryProvider: Send + Sync {
    async fn cursor_position(&self) -> Point;

    /// Рабочая область дисплея, содержащего точку
    async fn work_area(&self, point: Point) -> Bounds;
}

/// Геометрия через xdotool (X11 / XWayland)
pub struct XdotoolGeometry {
    locator: PointerLocator,
    fallback: Bounds,
}

impl Default for XdotoolGeometry {
    fn default() -> Self {
        Self::new()
    }
}

impl XdotoolGeometry {
    pub fn new() -> Self {
        Self {
            locator: PointerLocator::new(),
            fallback: Bounds::new(0, 0, 1920, 1080),
        }
    }
}

#[async_trait::async_trait]
impl GeometryProvider for XdotoolGeometry {
    async fn cursor_position(&self) -> Point {
        let (x, y) = self.locator.position_or_origin().await;
        Point::new(x, y)
    }

    async fn work_area(&self, _point: Point) -> Bounds {
        let output = match Command::new("xdotool").arg("getdisplaygeometry").output().await {
            Ok(output) if output.status.success() => output,
            Ok(output) => {
                debug!(
                    "xdotool getdisplaygeometry вернул ошибку: {}",
                    String::from_utf8_lossy(&output.stderr)
                );
                return self.fallback;
            }
            Err(e) => {
                debug!("xdotool не найден: {}", e);
                return self.fallback;
            }
        };

        parse_display_geometry(&String::from_utf8_lossy(&output.stdout)).unwrap_or(self.fallback)
    }
}

/// Разбор вывода `xdotool getdisplaygeometry`: "1920 1080"
fn parse_display_geometry(output: &str) -> Option<Bounds> {
    let mut parts = output.split_whitespace();
    let width = parts.next()?.parse().ok()?;
    let height = parts.next()?.parse().ok()?;
    Some(Bounds::new(0, 0, width, height))
}
