//! Software-rendered play window using `minifb`.
//!
//! Layout:
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │ HUD: game · level · score · time · progress                  │
//! │                                                              │
//! │        entities (sprites as tinted boxes, labels below)      │
//! │                                                              │
//! │               [cursor box + grab progress bar]               │
//! │                                                              │
//! │                    LEVEL UP! banner                          │
//! │ warnings                                                     │
//! │ key legend                                                   │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! The pointer stands in for the hand: its position drives the cursor, the
//! left button closes a fist and the right button pinches.

use std::sync::mpsc::Sender;
use std::time::Duration;

use minifb::{Key, KeyRepeat, MouseButton, MouseMode, Window, WindowOptions};

use entity_field::{Rect, Role};
use hand_gesture::SimInput;

use crate::config::Mode;
use crate::session::{EndReason, SessionPhase, Termination};
use crate::snapshot::RenderSnapshot;

// ════════════════════════════════════════════════════════════════════════════
// Layout constants
// ════════════════════════════════════════════════════════════════════════════

pub const WIN_W:    usize = 1280;
pub const WIN_H:    usize = 720;
const HUD_H:        usize = 28;
const BG_COLOR:     u32   = 0xFF1A1A2E;
const HUD_BG:       u32   = 0xFF0F3460;
const TEXT_COLOR:   u32   = 0xFFEEEEEE;
const DIM_TEXT:     u32   = 0xFF888888;
const GOLD:         u32   = 0xFFFFD700;
const WARN_COLOR:   u32   = 0xFFFF6B6B;
const CURSOR_OPEN:  u32   = 0xFFFFFFFF;
const CURSOR_PINCH: u32   = 0xFF00E5FF;
const CURSOR_GRAB:  u32   = 0xFF7CFC00;

// ════════════════════════════════════════════════════════════════════════════
// Canvas: pixel buffer and drawing primitives
// ════════════════════════════════════════════════════════════════════════════

/// ARGB pixel buffer with clipped drawing. Coordinates may be negative or
/// past the edge; anything outside is dropped.
pub struct Canvas {
    pub w:   usize,
    pub h:   usize,
    pub buf: Vec<u32>,
}

impl Canvas {
    pub fn new(w: usize, h: usize) -> Self {
        Canvas { w, h, buf: vec![BG_COLOR; w * h] }
    }

    pub fn clear(&mut self, color: u32) {
        self.buf.fill(color);
    }

    pub fn pixel(&self, x: usize, y: usize) -> Option<u32> {
        (x < self.w && y < self.h).then(|| self.buf[y * self.w + x])
    }

    pub fn set_pixel(&mut self, x: i32, y: i32, color: u32) {
        if x >= 0 && y >= 0 && (x as usize) < self.w && (y as usize) < self.h {
            self.buf[y as usize * self.w + x as usize] = color;
        }
    }

    pub fn fill_rect(&mut self, x: i32, y: i32, w: i32, h: i32, color: u32) {
        let x0 = x.max(0);
        let y0 = y.max(0);
        let x1 = (x + w).min(self.w as i32);
        let y1 = (y + h).min(self.h as i32);
        for row in y0..y1 {
            for col in x0..x1 {
                self.buf[row as usize * self.w + col as usize] = color;
            }
        }
    }

    pub fn draw_border(&mut self, x: i32, y: i32, w: i32, h: i32, color: u32) {
        if w <= 0 || h <= 0 { return; }
        for col in x..x + w {
            self.set_pixel(col, y, color);
            self.set_pixel(col, y + h - 1, color);
        }
        for row in y..y + h {
            self.set_pixel(x, row, color);
            self.set_pixel(x + w - 1, row, color);
        }
    }

    /// Thick border, `t` pixels wide, drawn inward.
    pub fn draw_frame(&mut self, x: i32, y: i32, w: i32, h: i32, t: i32, color: u32) {
        for i in 0..t {
            self.draw_border(x + i, y + i, w - 2 * i, h - 2 * i, color);
        }
    }

    /// 3×5 bitmap text, each font pixel drawn as a `scale`×`scale` block.
    pub fn draw_label(&mut self, text: &str, x: i32, y: i32, scale: i32, color: u32) {
        let mut cx = x;
        for ch in text.chars() {
            let glyph = char_glyph(ch);
            for (row, &bits) in glyph.iter().enumerate() {
                for col in 0..3 {
                    if bits & (1 << (2 - col)) != 0 {
                        self.fill_rect(cx + col * scale, y + row as i32 * scale, scale, scale, color);
                    }
                }
            }
            cx += 4 * scale;
            if cx >= self.w as i32 { break; }
        }
    }

    pub fn label_width(text: &str, scale: i32) -> i32 {
        text.chars().count() as i32 * 4 * scale
    }
}

// ════════════════════════════════════════════════════════════════════════════
// Visualizer
// ════════════════════════════════════════════════════════════════════════════

pub struct Visualizer {
    window:  Window,
    canvas:  Canvas,
    sim_tx:  Sender<SimInput>,
    pointer: Option<(f32, f32)>,
    left:    bool,
    right:   bool,
}

impl Visualizer {
    pub fn new(title: &str, sim_tx: Sender<SimInput>) -> Result<Self, String> {
        let mut window = Window::new(
            title,
            WIN_W, WIN_H,
            WindowOptions {
                resize: false,
                ..WindowOptions::default()
            },
        ).map_err(|e| e.to_string())?;

        window.limit_update_rate(Some(Duration::from_millis(16)));

        Ok(Visualizer {
            window,
            canvas: Canvas::new(WIN_W, WIN_H),
            sim_tx,
            pointer: None,
            left: false,
            right: false,
        })
    }

    pub fn is_open(&self) -> bool { self.window.is_open() }

    /// Translate pointer and buttons into [`SimInput`]. Returns false when the
    /// player asked to quit.
    pub fn poll_input(&mut self) -> bool {
        if !self.window.is_open()
            || self.window.is_key_pressed(Key::Q, KeyRepeat::No)
            || self.window.is_key_pressed(Key::Escape, KeyRepeat::No)
        {
            let _ = self.sim_tx.send(SimInput::Quit);
            return false;
        }

        let pointer = self
            .window
            .get_mouse_pos(MouseMode::Discard)
            .map(|(x, y)| (x / WIN_W as f32, y / WIN_H as f32));
        if pointer != self.pointer {
            let input = match pointer {
                Some((x, y)) => SimInput::PointerMoved { x, y },
                None         => SimInput::HandLost,
            };
            let _ = self.sim_tx.send(input);
            self.pointer = pointer;
        }

        let left = self.window.get_mouse_down(MouseButton::Left) || self.window.is_key_down(Key::Space);
        if left != self.left {
            let _ = self.sim_tx.send(SimInput::Grab(left));
            self.left = left;
        }
        let right = self.window.get_mouse_down(MouseButton::Right) || self.window.is_key_down(Key::P);
        if right != self.right {
            let _ = self.sim_tx.send(SimInput::Pinch(right));
            self.right = right;
        }
        true
    }

    pub fn render(&mut self, snap: &RenderSnapshot) {
        draw_snapshot(&mut self.canvas, snap);
        self.window.update_with_buffer(&self.canvas.buf, WIN_W, WIN_H).ok();
    }
}

// ════════════════════════════════════════════════════════════════════════════
// Scene drawing
// ════════════════════════════════════════════════════════════════════════════

/// Scale from field coordinates to canvas pixels.
struct View {
    sx: f32,
    sy: f32,
    ox: f32,
    oy: f32,
}

impl View {
    fn fit(bounds: &Rect, c: &Canvas) -> Self {
        let sx = if bounds.w > 0.0 { c.w as f32 / bounds.w } else { 1.0 };
        let sy = if bounds.h > 0.0 { c.h as f32 / bounds.h } else { 1.0 };
        View { sx, sy, ox: bounds.x, oy: bounds.y }
    }

    fn rect(&self, r: &Rect) -> (i32, i32, i32, i32) {
        (
            ((r.x - self.ox) * self.sx) as i32,
            ((r.y - self.oy) * self.sy) as i32,
            (r.w * self.sx).round() as i32,
            (r.h * self.sy).round() as i32,
        )
    }
}

pub fn draw_snapshot(c: &mut Canvas, snap: &RenderSnapshot) {
    c.clear(BG_COLOR);
    let view = View::fit(&snap.bounds, c);
    let selected = snap.selected().map(|e| e.id);

    // ── Entities ──────────────────────────────────────────────────────────
    for e in &snap.entities {
        let (x, y, w, h) = view.rect(&e.rect);
        let base = kind_color(e.kind);
        let color = match (e.role, e.matched) {
            (_, true)        => blend(base, 0xFF555555, 0.7),
            (Role::Target, _) => blend(base, 0xFF000000, 0.75),
            _                => base,
        };
        c.fill_rect(x, y, w, h, color);
        c.draw_border(x, y, w, h, 0xFF000000);
        if selected == Some(e.id) {
            c.draw_frame(x - 3, y - 3, w + 6, h + 6, 3, GOLD);
        }
        if let Some(progress) = snap.dwell_on(e.id) {
            c.fill_rect(x, y - 8, (w as f32 * progress) as i32, 4, GOLD);
        }
        let lw = Canvas::label_width(&e.label, 1);
        c.draw_label(&e.label, x + (w - lw) / 2, y + h + 3, 1, TEXT_COLOR);
    }

    // ── Cursor ────────────────────────────────────────────────────────────
    let cur = &snap.cursor;
    let (x, y, w, h) = view.rect(&cur.rect);
    let color = if !cur.hand_present {
        DIM_TEXT
    } else if cur.grabbing {
        CURSOR_GRAB
    } else if cur.pinching {
        CURSOR_PINCH
    } else {
        CURSOR_OPEN
    };
    c.draw_frame(x, y, w, h, 2, color);
    if cur.moving_up {
        c.draw_label("^", x + w / 2 - 1, y - 8, 1, color);
    }
    if cur.grabbing && cur.grab_progress < 1.0 {
        c.fill_rect(x, y + h + 4, w, 5, 0xFF333333);
        c.fill_rect(x, y + h + 4, (w as f32 * cur.grab_progress) as i32, 5, CURSOR_GRAB);
    }

    // ── HUD ───────────────────────────────────────────────────────────────
    c.fill_rect(0, 0, c.w as i32, HUD_H as i32, HUD_BG);
    c.draw_label(&hud_line(snap), 10, 7, 2, TEXT_COLOR);
    if snap.max_score > 0 {
        let bar = (c.w as f32 * snap.score as f32 / snap.max_score as f32) as i32;
        c.fill_rect(0, HUD_H as i32 - 3, bar, 3, GOLD);
    }

    // ── Banner ────────────────────────────────────────────────────────────
    if let Some(b) = &snap.banner {
        let scale = 6;
        let bw = Canvas::label_width(&b.text, scale);
        let color = blend(BG_COLOR, GOLD, b.alpha);
        c.draw_label(&b.text, (c.w as i32 - bw) / 2, c.h as i32 / 2 - 15, scale, color);
    }

    // ── End screen ────────────────────────────────────────────────────────
    if let SessionPhase::Finished { termination } = snap.phase {
        let text = end_text(termination);
        let bw = Canvas::label_width(text, 5);
        c.draw_label(text, (c.w as i32 - bw) / 2, c.h as i32 / 3, 5, TEXT_COLOR);
    }

    // ── Warnings and legend ───────────────────────────────────────────────
    let mut wy = c.h as i32 - 34;
    for w in snap.warnings.iter().rev().take(3) {
        c.draw_label(w, 10, wy, 1, WARN_COLOR);
        wy -= 9;
    }
    c.draw_label(
        "mouse=hand  left/space=fist  right/p=pinch  q=quit",
        10, c.h as i32 - 14, 1, DIM_TEXT,
    );
}

fn hud_line(snap: &RenderSnapshot) -> String {
    let progress = match snap.mode {
        Mode::Catch { .. } => format!("caught {}", snap.catches),
        Mode::Match(_)     => format!("matched {}", snap.matches),
        Mode::Pick(_)      => format!("found {}  strikes {}", snap.matches, snap.strikes),
    };
    let goal = snap.objective.map(|o| format!("/{}", o)).unwrap_or_default();
    format!(
        "{:?}  level {}/{}  score {}/{}  time {:.0}  {}{}",
        snap.game, snap.level, snap.max_level, snap.score, snap.max_score, snap.remaining, progress, goal,
    )
}

fn end_text(t: Termination) -> &'static str {
    match t {
        Termination::Normal { reason: EndReason::ObjectiveMet } => "well done!",
        Termination::Normal { .. } => "session complete",
        Termination::Aborted       => "session ended",
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Colors
// ────────────────────────────────────────────────────────────────────────────

/// Distinct, opaque color per entity kind.
pub fn kind_color(kind: usize) -> u32 {
    // Golden-angle hue steps keep neighbouring kinds apart.
    let hue = (kind as f32 * 137.5) % 360.0;
    hsv_to_argb(hue, 0.75, 0.92)
}

/// Convert HSV → packed ARGB (0xAARRGGBB, A=0xFF).
fn hsv_to_argb(h: f32, s: f32, v: f32) -> u32 {
    let h  = h % 360.0;
    let hi = (h / 60.0) as u32;
    let f  = h / 60.0 - hi as f32;
    let p  = v * (1.0 - s);
    let q  = v * (1.0 - s * f);
    let t  = v * (1.0 - s * (1.0 - f));
    let (r, g, b) = match hi {
        0 => (v, t, p),
        1 => (q, v, p),
        2 => (p, v, t),
        3 => (p, q, v),
        4 => (t, p, v),
        _ => (v, p, q),
    };
    let ri = (r * 255.0) as u32;
    let gi = (g * 255.0) as u32;
    let bi = (b * 255.0) as u32;
    0xFF000000 | (ri << 16) | (gi << 8) | bi
}

/// Alpha-blend two ARGB colors. `t` = 0.0 → all `a`, `t` = 1.0 → all `b`.
pub fn blend(a: u32, b: u32, t: f32) -> u32 {
    let t = t.clamp(0.0, 1.0);
    let lerp = |ca: u32, cb: u32| (ca as f32 * (1.0 - t) + cb as f32 * t) as u32;
    let ar = (a >> 16) & 0xFF; let br = (b >> 16) & 0xFF;
    let ag = (a >>  8) & 0xFF; let bg = (b >>  8) & 0xFF;
    let ab =  a        & 0xFF; let bb =  b        & 0xFF;
    0xFF000000 | (lerp(ar, br) << 16) | (lerp(ag, bg) << 8) | lerp(ab, bb)
}

// ────────────────────────────────────────────────────────────────────────────
// Minimal 3×5 bitmap font
// ────────────────────────────────────────────────────────────────────────────

fn char_glyph(c: char) -> [u8; 5] {
    match c {
        '0' => [0b111, 0b101, 0b101, 0b101, 0b111],
        '1' => [0b010, 0b110, 0b010, 0b010, 0b111],
        '2' => [0b111, 0b001, 0b111, 0b100, 0b111],
        '3' => [0b111, 0b001, 0b111, 0b001, 0b111],
        '4' => [0b101, 0b101, 0b111, 0b001, 0b001],
        '5' => [0b111, 0b100, 0b111, 0b001, 0b111],
        '6' => [0b111, 0b100, 0b111, 0b101, 0b111],
        '7' => [0b111, 0b001, 0b001, 0b001, 0b001],
        '8' => [0b111, 0b101, 0b111, 0b101, 0b111],
        '9' => [0b111, 0b101, 0b111, 0b001, 0b111],
        'a' | 'A' => [0b111, 0b101, 0b111, 0b101, 0b101],
        'b' | 'B' => [0b110, 0b101, 0b110, 0b101, 0b110],
        'c' | 'C' => [0b111, 0b100, 0b100, 0b100, 0b111],
        'd' | 'D' => [0b110, 0b101, 0b101, 0b101, 0b110],
        'e' | 'E' => [0b111, 0b100, 0b111, 0b100, 0b111],
        'f' | 'F' => [0b111, 0b100, 0b111, 0b100, 0b100],
        'g' | 'G' => [0b111, 0b100, 0b101, 0b101, 0b111],
        'h' | 'H' => [0b101, 0b101, 0b111, 0b101, 0b101],
        'i' | 'I' => [0b111, 0b010, 0b010, 0b010, 0b111],
        'j' | 'J' => [0b001, 0b001, 0b001, 0b101, 0b111],
        'k' | 'K' => [0b101, 0b101, 0b110, 0b101, 0b101],
        'l' | 'L' => [0b100, 0b100, 0b100, 0b100, 0b111],
        'm' | 'M' => [0b101, 0b111, 0b101, 0b101, 0b101],
        'n' | 'N' => [0b111, 0b101, 0b101, 0b101, 0b101],
        'o' | 'O' => [0b111, 0b101, 0b101, 0b101, 0b111],
        'p' | 'P' => [0b111, 0b101, 0b111, 0b100, 0b100],
        'q' | 'Q' => [0b111, 0b101, 0b101, 0b111, 0b001],
        'r' | 'R' => [0b110, 0b101, 0b110, 0b101, 0b101],
        's' | 'S' => [0b111, 0b100, 0b111, 0b001, 0b111],
        't' | 'T' => [0b111, 0b010, 0b010, 0b010, 0b010],
        'u' | 'U' => [0b101, 0b101, 0b101, 0b101, 0b111],
        'v' | 'V' => [0b101, 0b101, 0b101, 0b010, 0b010],
        'w' | 'W' => [0b101, 0b101, 0b101, 0b111, 0b101],
        'x' | 'X' => [0b101, 0b101, 0b010, 0b101, 0b101],
        'y' | 'Y' => [0b101, 0b101, 0b111, 0b010, 0b010],
        'z' | 'Z' => [0b111, 0b001, 0b010, 0b100, 0b111],
        '/' => [0b001, 0b001, 0b010, 0b100, 0b100],
        '-' => [0b000, 0b000, 0b111, 0b000, 0b000],
        '.' => [0b000, 0b000, 0b000, 0b000, 0b010],
        ',' => [0b000, 0b000, 0b000, 0b010, 0b100],
        ':' => [0b000, 0b010, 0b000, 0b010, 0b000],
        '=' => [0b000, 0b111, 0b000, 0b111, 0b000],
        '+' => [0b000, 0b010, 0b111, 0b010, 0b000],
        '!' => [0b010, 0b010, 0b010, 0b000, 0b010],
        '^' => [0b010, 0b101, 0b000, 0b000, 0b000],
        '(' => [0b001, 0b010, 0b010, 0b010, 0b001],
        ')' => [0b100, 0b010, 0b010, 0b010, 0b100],
        ' ' => [0b000, 0b000, 0b000, 0b000, 0b000],
        _   => [0b000, 0b000, 0b010, 0b000, 0b000], // fallback dot
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_colors_distinct_and_opaque() {
        let colors: Vec<u32> = (0..12).map(kind_color).collect();
        for (i, c) in colors.iter().enumerate() {
            assert_eq!(c >> 24, 0xFF, "kind {} color should be opaque", i);
            assert!(!colors[..i].contains(c), "kind {} repeats a color", i);
        }
    }

    #[test]
    fn fill_rect_clips_offscreen_parts() {
        let mut c = Canvas::new(20, 10);
        c.fill_rect(-5, -5, 10, 10, 0xFFFF0000);
        assert_eq!(c.pixel(0, 0), Some(0xFFFF0000));
        assert_eq!(c.pixel(4, 4), Some(0xFFFF0000));
        assert_eq!(c.pixel(5, 5), Some(BG_COLOR));
        c.fill_rect(15, 5, 100, 100, 0xFF00FF00);
        assert_eq!(c.pixel(19, 9), Some(0xFF00FF00));
    }

    #[test]
    fn label_scales_glyph_pixels() {
        let mut c = Canvas::new(40, 20);
        c.draw_label("1", 0, 0, 2, 0xFFFFFFFF);
        // Top row of '1' is the middle column only.
        assert_eq!(c.pixel(2, 0), Some(0xFFFFFFFF));
        assert_eq!(c.pixel(3, 1), Some(0xFFFFFFFF));
        assert_eq!(c.pixel(0, 0), Some(BG_COLOR));
        assert_eq!(Canvas::label_width("abc", 2), 24);
    }

    #[test]
    fn snapshot_paints_hud_and_board() {
        use crate::config::GameKind;
        use crate::games::preset;
        use crate::session::Session;
        use skill_ladder::MemoryProfileStore;

        let s = Session::start(preset(GameKind::Shadow), Box::new(MemoryProfileStore::new())).unwrap();
        let snap = s.snapshot();
        let mut c = Canvas::new(WIN_W, WIN_H);
        draw_snapshot(&mut c, &snap);

        assert_eq!(c.pixel(WIN_W - 1, 1), Some(HUD_BG));
        assert!(!snap.entities.is_empty());
        for e in &snap.entities {
            let center = e.rect.center();
            assert_ne!(c.pixel(center.x as usize, center.y as usize), Some(BG_COLOR), "{} not drawn", e.label);
        }
    }

    #[test]
    fn blend_endpoints() {
        assert_eq!(blend(0xFF000000, 0xFFFFFFFF, 0.0), 0xFF000000);
        assert_eq!(blend(0xFF000000, 0xFFFFFFFF, 1.0), 0xFFFFFFFF);
    }
}
