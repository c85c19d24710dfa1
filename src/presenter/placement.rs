use super::geometry::{Bounds, Point};
use crate::constants::{POPUP_GAP, POPUP_HEIGHT, POPUP_PREVIEW_CHARS, POPUP_WIDTH};
use crate::events::Rect;

/// Положение всплывающего окна.
///
/// Окно ставится над выделением, выровненным по правому краю. Для нулевого
/// прямоугольника окно ставится над указателем. Затем оно прижимается к
/// рабочей области дисплея слева, справа и сверху.
pub fn popup_bounds(rect: Rect, cursor: Point, work_area: Bounds) -> Bounds {
    let (mut x, mut y) = if rect.is_degenerate() {
        (cursor.x, cursor.y - POPUP_HEIGHT - POPUP_GAP)
    } else {
        (
            (rect.x + rect.width).round() as i32 - POPUP_WIDTH,
            rect.y.round() as i32 - POPUP_HEIGHT - POPUP_GAP,
        )
    };

    if x < work_area.x {
        x = work_area.x + POPUP_GAP;
    }
    if x + POPUP_WIDTH > work_area.right() {
        x = work_area.right() - POPUP_WIDTH - POPUP_GAP;
    }
    if y < work_area.y {
        y = work_area.y + POPUP_GAP;
    }

    Bounds::new(x, y, POPUP_WIDTH, POPUP_HEIGHT)
}

/// Превью текста для окна: первые символы и многоточие
pub fn preview_text(text: &str) -> String {
    if text.chars().count() > POPUP_PREVIEW_CHARS {
        let head: String = text.chars().take(POPUP_PREVIEW_CHARS).collect();
        format!("{}…", head)
    } else {
        text.to_string()
    }
}
