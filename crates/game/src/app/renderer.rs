use std::sync::Arc;

use escape_engine::{GameSnapshot, MinigameView, Point2D, RoomId, SurfaceTint};
use pixels::{Error, Pixels, SurfaceTexture};
use winit::window::Window;

const ROOM_COLORS: [[u8; 4]; 5] = [
    [38, 42, 54, 255],
    [66, 44, 36, 255],
    [30, 52, 64, 255],
    [56, 40, 60, 255],
    [34, 58, 38, 255],
];
const DOOR_COLOR: [u8; 4] = [196, 150, 82, 255];
const NPC_COLOR: [u8; 4] = [235, 200, 70, 255];
const PLAYER_COLOR: [u8; 4] = [90, 190, 255, 255];
const COMPLETED_BORDER_COLOR: [u8; 4] = [120, 230, 140, 255];
const PANEL_BORDER_COLOR: [u8; 4] = [230, 230, 240, 255];
const OPTION_COLOR: [u8; 4] = [70, 76, 92, 255];
const HIDDEN_CARD_COLOR: [u8; 4] = [100, 150, 200, 255];
const MATCHED_CARD_COLOR: [u8; 4] = [77, 255, 150, 255];
const SELECTED_OUTLINE_COLOR: [u8; 4] = [255, 236, 120, 255];
const CARD_COLORS: [[u8; 4]; 8] = [
    [230, 80, 80, 255],
    [240, 160, 60, 255],
    [240, 230, 90, 255],
    [120, 210, 90, 255],
    [80, 200, 220, 255],
    [110, 120, 240, 255],
    [190, 110, 230, 255],
    [240, 130, 190, 255],
];
/// Labels the memory board uses for face-down and matched cards.
pub(crate) const HIDDEN_CARD_LABEL: &str = "?";
pub(crate) const MATCHED_CARD_LABEL: &str = "*";

/// Axis-aligned rectangle in buffer pixels, already clipped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct PixelRect {
    left: u32,
    top: u32,
    right: u32,
    bottom: u32,
}

/// Draws snapshots into a buffer the size of the logical environment; pixels
/// scales that buffer onto the window surface.
pub(crate) struct Renderer {
    window: Arc<Window>,
    pixels: Pixels<'static>,
    buffer_size: (u32, u32),
    surface_size: (u32, u32),
}

impl Renderer {
    pub(crate) fn new(window: Arc<Window>, environment_size: Point2D) -> Result<Self, Error> {
        let size = window.inner_size();
        let buffer_size = buffer_size_for(environment_size);
        let surface_size = (size.width.max(1), size.height.max(1));
        let pixels = Self::build_pixels(Arc::clone(&window), buffer_size, surface_size)?;
        Ok(Self {
            window,
            pixels,
            buffer_size,
            surface_size,
        })
    }

    pub(crate) fn resize_surface(&mut self, width: u32, height: u32) -> Result<(), Error> {
        if width == 0 || height == 0 {
            return Ok(());
        }
        self.surface_size = (width, height);
        self.rebuild()
    }

    pub(crate) fn render(&mut self, snapshot: &GameSnapshot) -> Result<(), Error> {
        let buffer_size = buffer_size_for(snapshot.environment_size);
        if buffer_size != self.buffer_size {
            self.buffer_size = buffer_size;
            self.rebuild()?;
        }

        let (width, height) = self.buffer_size;
        let frame = self.pixels.frame_mut();
        let clear_color = room_color(snapshot.room_id);
        for chunk in frame.chunks_exact_mut(4) {
            chunk.copy_from_slice(&clear_color);
        }

        for door in &snapshot.doors {
            fill_box(frame, width, height, door.position, door.size, DOOR_COLOR);
        }
        if let Some(npc) = &snapshot.npc {
            fill_box(frame, width, height, npc.position, npc.size, NPC_COLOR);
        }
        fill_box(
            frame,
            width,
            height,
            snapshot.player.position,
            snapshot.player.size,
            PLAYER_COLOR,
        );
        if snapshot.all_rooms_completed {
            outline_rect(
                frame,
                width,
                PixelRect {
                    left: 0,
                    top: 0,
                    right: width,
                    bottom: height,
                },
                COMPLETED_BORDER_COLOR,
                4,
            );
        }
        if let Some(minigame) = &snapshot.minigame {
            draw_minigame_panel(frame, width, height, &minigame.view);
        }

        self.pixels.render()
    }

    fn rebuild(&mut self) -> Result<(), Error> {
        self.pixels =
            Self::build_pixels(Arc::clone(&self.window), self.buffer_size, self.surface_size)?;
        Ok(())
    }

    fn build_pixels(
        window: Arc<Window>,
        buffer_size: (u32, u32),
        surface_size: (u32, u32),
    ) -> Result<Pixels<'static>, Error> {
        let surface = SurfaceTexture::new(surface_size.0, surface_size.1, window);
        Pixels::new(buffer_size.0, buffer_size.1, surface)
    }
}

fn buffer_size_for(environment_size: Point2D) -> (u32, u32) {
    (
        u32::try_from(environment_size.x).unwrap_or(1).max(1),
        u32::try_from(environment_size.y).unwrap_or(1).max(1),
    )
}

fn room_color(room_id: RoomId) -> [u8; 4] {
    ROOM_COLORS[room_id.0 % ROOM_COLORS.len()]
}

fn tint_color(tint: SurfaceTint) -> [u8; 4] {
    match tint {
        SurfaceTint::Neutral => [44, 48, 60, 255],
        SurfaceTint::Waiting => [200, 50, 50, 255],
        SurfaceTint::Go => [40, 200, 70, 255],
        SurfaceTint::Success => [220, 200, 60, 255],
        SurfaceTint::Failure => [110, 110, 110, 255],
    }
}

fn option_color(label: &str) -> [u8; 4] {
    match label {
        HIDDEN_CARD_LABEL => HIDDEN_CARD_COLOR,
        MATCHED_CARD_LABEL => MATCHED_CARD_COLOR,
        _ if label.len() == 1 => {
            let index = usize::from(label.as_bytes()[0].wrapping_sub(b'A'));
            CARD_COLORS[index % CARD_COLORS.len()]
        }
        _ => OPTION_COLOR,
    }
}

/// Options lay out as a single column, or a square-ish grid for boards.
fn option_grid_columns(option_count: usize) -> usize {
    if option_count <= 4 {
        return 1;
    }
    let mut columns = 1;
    while columns * columns < option_count {
        columns += 1;
    }
    columns
}

fn clip_rect(position: Point2D, size: Point2D, width: u32, height: u32) -> Option<PixelRect> {
    let clamp = |value: i64, limit: u32| value.clamp(0, i64::from(limit)) as u32;
    let left = i64::from(position.x);
    let top = i64::from(position.y);
    let rect = PixelRect {
        left: clamp(left, width),
        top: clamp(top, height),
        right: clamp(left + i64::from(size.x), width),
        bottom: clamp(top + i64::from(size.y), height),
    };
    (rect.left < rect.right && rect.top < rect.bottom).then_some(rect)
}

fn fill_box(
    frame: &mut [u8],
    width: u32,
    height: u32,
    position: Point2D,
    size: Point2D,
    color: [u8; 4],
) {
    if let Some(rect) = clip_rect(position, size, width, height) {
        fill_rect(frame, width, rect, color);
    }
}

fn fill_rect(frame: &mut [u8], width: u32, rect: PixelRect, color: [u8; 4]) {
    let row_bytes = width as usize * 4;
    for y in rect.top..rect.bottom {
        let row_start = y as usize * row_bytes;
        let start = row_start + rect.left as usize * 4;
        let end = row_start + rect.right as usize * 4;
        let Some(row) = frame.get_mut(start..end) else {
            return;
        };
        for chunk in row.chunks_exact_mut(4) {
            chunk.copy_from_slice(&color);
        }
    }
}

fn outline_rect(frame: &mut [u8], width: u32, rect: PixelRect, color: [u8; 4], thickness: u32) {
    let t = thickness
        .min((rect.right - rect.left) / 2)
        .min((rect.bottom - rect.top) / 2);
    let edges = [
        PixelRect {
            bottom: rect.top + t,
            ..rect
        },
        PixelRect {
            top: rect.bottom - t,
            ..rect
        },
        PixelRect {
            right: rect.left + t,
            ..rect
        },
        PixelRect {
            left: rect.right - t,
            ..rect
        },
    ];
    for edge in edges {
        fill_rect(frame, width, edge, color);
    }
}

fn draw_minigame_panel(frame: &mut [u8], width: u32, height: u32, view: &MinigameView) {
    let panel_position = Point2D::new((width / 6) as i32, (height / 6) as i32);
    let panel_size = Point2D::new((width * 2 / 3) as i32, (height * 2 / 3) as i32);
    let Some(panel) = clip_rect(panel_position, panel_size, width, height) else {
        return;
    };
    fill_rect(frame, width, panel, tint_color(view.tint));
    outline_rect(frame, width, panel, PANEL_BORDER_COLOR, 3);

    if view.options.is_empty() {
        return;
    }
    let columns = option_grid_columns(view.options.len());
    let rows = view.options.len().div_ceil(columns);
    let margin = 16u32;
    let inner_width = (panel.right - panel.left).saturating_sub(margin * 2);
    let inner_height = (panel.bottom - panel.top).saturating_sub(margin * 2);
    let cell_width = inner_width / columns as u32;
    let cell_height = inner_height / rows as u32;
    let gap = 6u32;

    for (index, label) in view.options.iter().enumerate() {
        let column = (index % columns) as u32;
        let row = (index / columns) as u32;
        let position = Point2D::new(
            (panel.left + margin + column * cell_width + gap / 2) as i32,
            (panel.top + margin + row * cell_height + gap / 2) as i32,
        );
        let size = Point2D::new(
            cell_width.saturating_sub(gap) as i32,
            cell_height.saturating_sub(gap) as i32,
        );
        let Some(cell) = clip_rect(position, size, width, height) else {
            continue;
        };
        fill_rect(frame, width, cell, option_color(label));
        if view.selected == Some(index) {
            outline_rect(frame, width, cell, SELECTED_OUTLINE_COLOR, 3);
        }
    }
}
