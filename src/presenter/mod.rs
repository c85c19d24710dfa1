//! Сторона презентера: показ всплывающего окна по событию из канала.
//!
//! Рендеринг окна здесь не реализован; `LogPresenter` рассчитывает
//! положение окна так же, как это делал бы настоящий UI, и пишет его в лог.

mod geometry;
mod helper;
mod placement;

pub use geometry::{Bounds, GeometryProvider, Point, XdotoolGeometry};
pub use helper::launch_helper;
pub use placement::{popup_bounds, preview_text};

use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::constants::ACTION_REPLY_QUERY_CHARS;
use crate::error::Result;
use crate::events::Rect;

/// Ответ внешнего бэкенда на действие "спросить ИИ"
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActionReply {
    pub query: String,
    pub reply: String,
}

impl ActionReply {
    /// Ответ-заглушка вместо обращения к бэкенду
    pub fn demo(text: &str) -> Self {
        let head: String = text.chars().take(ACTION_REPLY_QUERY_CHARS).collect();
        Self {
            query: text.to_string(),
            reply: format!("Demo reply for: \"{}\"", head),
        }
    }
}

/// Контроллер показа, вызываемый клиентом канала
#[async_trait::async_trait]
pub trait PresentationController: Send + Sync {
    /// Показать окно рядом с выделением (rect может быть нулевым)
    async fn show(&self, text: &str, rect: Rect);

    /// Запрос действия к внешнему бэкенду
    async fn request_action(&self, text: &str) -> Result<ActionReply>;
}

/// Презентер без окна: считает положение и пишет его в лог
pub struct LogPresenter {
    geometry: Arc<dyn GeometryProvider>,
    /// Сразу "нажимать" кнопку окна и логировать ответ
    auto_request: bool,
}

impl LogPresenter {
    pub fn new(geometry: Arc<dyn GeometryProvider>) -> Self {
        Self {
            geometry,
            auto_request: false,
        }
    }

    pub fn with_auto_request(mut self, auto_request: bool) -> Self {
        self.auto_request = auto_request;
        self
    }
}

#[async_trait::async_trait]
impl PresentationController for LogPresenter {
    async fn show(&self, text: &str, rect: Rect) {
        let cursor = self.geometry.cursor_position().await;
        let anchor = if rect.is_degenerate() {
            cursor
        } else {
            Point::new(rect.x.round() as i32, rect.y.round() as i32)
        };
        let work_area = self.geometry.work_area(anchor).await;
        let bounds = popup_bounds(rect, cursor, work_area);

        info!(
            "Всплывающее окно в {},{} ({}x{}): {}",
            bounds.x,
            bounds.y,
            bounds.width,
            bounds.height,
            preview_text(text)
        );

        if self.auto_request {
            match self.request_action(text).await {
                Ok(reply) => info!("Ответ: {}", reply.reply),
                Err(e) => warn!("Запрос действия не выполнен: {}", e),
            }
        }
    }

    async fn request_action(&self, text: &str) -> Result<ActionReply> {
        debug!("Запрос действия для {} симв.", text.chars().count());
        Ok(ActionReply::demo(text))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_demo_reply_truncates_query() {
        let text = "x".repeat(500);
        let reply = ActionReply::demo(&text);
        assert_eq!(reply.query.len(), 500);
        assert_eq!(reply.reply, format!("Demo reply for: \"{}\"", "x".repeat(200)));
    }

    #[tokio::test]
    async fn test_log_presenter_request_action() {
        struct Fixed;

        #[async_trait::async_trait]
        impl GeometryProvider for Fixed {
            async fn cursor_position(&self) -> Point {
                Point::new(10, 10)
            }

            async fn work_area(&self, _point: Point) -> Bounds {
                Bounds::new(0, 0, 800, 600)
            }
        }

        let presenter = LogPresenter::new(Arc::new(Fixed));
        presenter.show("selected", Rect::default()).await;
        let reply = presenter.request_action("selected").await.unwrap();
        assert_eq!(reply.reply, "Demo reply for: \"selected\"");
    }

    #[tokio::test]
    async fn test_show_reads_cursor_once() {
        use std::sync::atomic::{AtomicUsize, Ordering};

        #[derive(Default)]
        struct Counting {
            cursor_reads: AtomicUsize,
            anchors: parking_lot::Mutex<Vec<Point>>,
        }

        #[async_trait::async_trait]
        impl GeometryProvider for Counting {
            async fn cursor_position(&self) -> Point {
                self.cursor_reads.fetch_add(1, Ordering::SeqCst);
                Point::new(40, 50)
            }

            async fn work_area(&self, point: Point) -> Bounds {
                self.anchors.lock().push(point);
                Bounds::new(0, 0, 800, 600)
            }
        }

        let geometry = Arc::new(Counting::default());
        let presenter = LogPresenter::new(geometry.clone());

        presenter.show("no rect", Rect::default()).await;
        assert_eq!(geometry.cursor_reads.load(Ordering::SeqCst), 1);

        presenter.show("with rect", Rect::new(120.0, 80.0, 60.0, 18.0)).await;
        assert_eq!(geometry.cursor_reads.load(Ordering::SeqCst), 2);

        assert_eq!(*geometry.anchors.lock(), vec![Point::new(40, 50), Point::new(120, 80)]);
    }
}
