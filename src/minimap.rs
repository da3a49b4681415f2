//! Top-down overlay of the wall grid with the player marker.

use crate::color::pack_rgb;
use crate::renderer::Frame;
use crate::scheduler::PoseSnapshot;
use crate::world::WallGrid;

const BACKGROUND: u32 = pack_rgb(0, 0, 0);
const WALL: u32 = pack_rgb(136, 136, 136);
const PLAYER: u32 = pack_rgb(255, 0, 0);
const HEADING: u32 = pack_rgb(255, 255, 0);

#[derive(Debug, Clone, Copy)]
pub struct Minimap {
    /// Pixels per grid cell.
    pub cell: usize,
    /// Margin from the frame's top-right corner.
    pub margin: usize,
}

impl Default for Minimap {
    fn default() -> Self {
        Self { cell: 4, margin: 8 }
    }
}

impl Minimap {
    /// Pixel size of the map for a grid.
    pub fn extent(&self, walls: &WallGrid) -> (usize, usize) {
        (walls.width() * self.cell, walls.height() * self.cell)
    }

    /// Draws into the top-right corner; skipped if the frame is too small.
    pub fn draw(&self, frame: &mut Frame, walls: &WallGrid, snapshot: &PoseSnapshot) {
        let (w, h) = self.extent(walls);
        if w + self.margin > frame.width || h + self.margin > frame.height || self.cell == 0 {
            return;
        }
        let ox = (frame.width - w - self.margin) as i32;
        let oy = self.margin as i32;
        let cell = self.cell as i32;

        frame.fill_rect(ox, oy, w as i32, h as i32, BACKGROUND);
        for (x, y, id) in walls.iter() {
            if id > 0 {
                // One pixel gap keeps cells readable.
                let gap = i32::from(cell > 2);
                frame.fill_rect(
                    ox + x as i32 * cell,
                    oy + y as i32 * cell,
                    cell - gap,
                    cell - gap,
                    WALL,
                );
            }
        }

        let pose = &snapshot.pose;
        let px = ox as f32 + pose.pos[0] * self.cell as f32;
        let py = oy as f32 + pose.pos[1] * self.cell as f32;

        let reach = 2.5 * self.cell as f32;
        line(
            frame,
            [px, py],
            [px + pose.dir[0] * reach, py + pose.dir[1] * reach],
            HEADING,
        );

        let r = (self.cell as i32 / 2).max(1);
        for dy in -r..=r {
            for dx in -r..=r {
                if dx * dx + dy * dy <= r * r {
                    frame.put(px as i32 + dx, py as i32 + dy, PLAYER);
                }
            }
        }
    }
}

fn line(frame: &mut Frame, a: [f32; 2], b: [f32; 2], color: u32) {
    let dx = b[0] - a[0];
    let dy = b[1] - a[1];
    let steps = dx.abs().max(dy.abs()).ceil().max(1.0) as i32;
    for i in 0..=steps {
        let t = i as f32 / steps as f32;
        frame.put(
            (a[0] + dx * t) as i32,
            (a[1] + dy * t) as i32,
            color,
        );
    }
}
