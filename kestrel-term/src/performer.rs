//! Applies parsed actions to the screen model
//!
//! The performer owns no screen state. Anything that has to leave the
//! engine (device replies and OSC commands) is queued as an [`Effect`] for
//! the engine to deliver after the chunk has been applied.

use terminal_core::{Attr, CellAttributes, Color, CursorShape, Screen};
use terminal_parser::{Action, CsiAction, EscAction, Params};

/// Primary device attributes: VT220 with ANSI color
const DA1_REPLY: &[u8] = b"\x1b[?62;22c";
/// Secondary device attributes: VT220, firmware 0, no ROM cartridge
const DA2_REPLY: &[u8] = b"\x1b[>1;0;0c";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    /// Bytes to write back to the child
    Reply(Vec<u8>),
    Osc { command: u16, argument: String },
}

#[derive(Debug, Default)]
pub struct Performer {
    effects: Vec<Effect>,
}

impl Performer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn take_effects(&mut self) -> Vec<Effect> {
        std::mem::take(&mut self.effects)
    }

    pub fn perform(&mut self, screen: &mut Screen, action: Action) {
        match action {
            Action::Print(c) => screen.print(c),
            Action::Execute(byte) => self.execute(screen, byte),
            Action::Esc(esc) => self.esc_dispatch(screen, esc),
            Action::Csi(csi) => self.csi_dispatch(screen, &csi),
            Action::Osc { command, argument } => {
                self.effects.push(Effect::Osc { command, argument });
            }
            Action::Dcs { final_byte, data, .. } => {
                log::debug!("Ignoring DCS {} ({} bytes)", final_byte as char, data.len());
            }
            Action::Invalid(bytes) => {
                log::debug!("Discarding malformed sequence {:?}", bytes);
            }
        }
    }

    fn execute(&mut self, screen: &mut Screen, byte: u8) {
        match byte {
            0x07 => log::debug!("Bell"),
            0x08 => screen.backspace(),
            0x09 => screen.tab(1),
            0x0A..=0x0C => screen.linefeed(),
            0x0D => screen.carriage_return(),
            _ => log::debug!("Ignoring C0 control {:#04x}", byte),
        }
    }

    fn esc_dispatch(&mut self, screen: &mut Screen, esc: EscAction) {
        match esc {
            EscAction::SaveCursor => screen.save_cursor(),
            EscAction::RestoreCursor => screen.restore_cursor(),
            EscAction::Index => screen.index(),
            EscAction::ReverseIndex => screen.reverse_index(),
            EscAction::NextLine => screen.next_line(),
            EscAction::HorizontalTabSet => screen.set_tab_stop(),
            EscAction::FullReset => screen.reset(),
            EscAction::ApplicationKeypad => screen.modes_mut().keypad_application = true,
            EscAction::NormalKeypad => screen.modes_mut().keypad_application = false,
            EscAction::Unknown(bytes) => {
                log::debug!("Unknown ESC sequence: {:?}", String::from_utf8_lossy(&bytes));
            }
        }
    }

    fn csi_dispatch(&mut self, screen: &mut Screen, csi: &CsiAction) {
        match (csi.marker, csi.intermediates.as_slice()) {
            (0, []) => self.csi_plain(screen, csi),
            (b'?', []) => self.csi_private(screen, csi),
            (b'>', []) if csi.final_byte == b'c' => self.reply(DA2_REPLY.to_vec()),
            (0, [b' ']) if csi.final_byte == b'q' => {
                // DECSCUSR
                if let Some((shape, blinking)) = CursorShape::from_decscusr(csi.params.raw(0)) {
                    let cursor = screen.cursor_mut();
                    cursor.shape = shape;
                    cursor.blinking = blinking;
                }
            }
            _ => log_unknown(csi),
        }
    }

    fn csi_plain(&mut self, screen: &mut Screen, csi: &CsiAction) {
        let n = csi.param(0, 1) as usize;
        match csi.final_byte {
            b'@' => screen.insert_chars(n),
            b'A' => screen.move_cursor_up(n),
            b'B' => screen.move_cursor_down(n),
            b'C' => screen.move_cursor_right(n),
            b'D' => screen.move_cursor_left(n),
            b'E' => {
                screen.move_cursor_down(n);
                screen.carriage_return();
            }
            b'F' => {
                screen.move_cursor_up(n);
                screen.carriage_return();
            }
            b'G' | b'`' => screen.set_cursor_col(n),
            b'H' | b'f' => screen.move_cursor_to(n, csi.param(1, 1) as usize),
            b'I' => screen.tab(n),
            b'J' => screen.erase_display(csi.params.raw(0)),
            b'K' => screen.erase_line(csi.params.raw(0)),
            b'L' => screen.insert_lines(n),
            b'M' => screen.delete_lines(n),
            b'P' => screen.delete_chars(n),
            b'S' => screen.scroll_up(n),
            b'T' => screen.scroll_down(n),
            b'X' => screen.erase_chars(n),
            b'Z' => screen.back_tab(n),
            b'd' => screen.set_cursor_row(n),
            b'g' => screen.clear_tab_stop(csi.params.raw(0)),
            b'h' | b'l' => {
                let value = csi.final_byte == b'h';
                for mode in csi.params.iter() {
                    if !screen.modes_mut().set_mode(mode, value) {
                        log::debug!("Unknown ANSI mode {}", mode);
                    }
                }
            }
            b'm' => sgr(&mut screen.cursor_mut().attrs, &csi.params),
            b'n' => match csi.params.raw(0) {
                5 => self.reply(b"\x1b[0n".to_vec()),
                6 => {
                    let cursor = screen.cursor();
                    let reply = format!("\x1b[{};{}R", cursor.row + 1, cursor.col + 1);
                    self.reply(reply.into_bytes());
                }
                mode => log::debug!("Unknown DSR {}", mode),
            },
            b'c' if csi.params.raw(0) == 0 => self.reply(DA1_REPLY.to_vec()),
            b'r' => screen.set_scroll_region(csi.params.raw(0) as usize, csi.params.raw(1) as usize),
            b's' => screen.save_cursor(),
            b'u' => screen.restore_cursor(),
            _ => log_unknown(csi),
        }
    }

    fn csi_private(&mut self, screen: &mut Screen, csi: &CsiAction) {
        match csi.final_byte {
            b'h' | b'l' => {
                let value = csi.final_byte == b'h';
                for mode in csi.params.iter() {
                    if !screen.set_private_mode(mode, value) {
                        log::debug!("Unknown DEC private mode {}", mode);
                    }
                }
            }
            _ => log_unknown(csi),
        }
    }

    fn reply(&mut self, bytes: Vec<u8>) {
        self.effects.push(Effect::Reply(bytes));
    }
}

fn log_unknown(csi: &CsiAction) {
    log::debug!(
        "Unknown CSI {}{:?}{}{}",
        if csi.marker == 0 { String::new() } else { (csi.marker as char).to_string() },
        csi.params,
        String::from_utf8_lossy(&csi.intermediates),
        csi.final_byte as char
    );
}

/// SGR, including both `38;5;n` and `38:5:n` color forms
fn sgr(attrs: &mut CellAttributes, params: &Params) {
    if params.is_empty() {
        attrs.reset();
        return;
    }

    let mut i = 0;
    while i < params.len() {
        let param = params.raw(i);
        match param {
            0 => attrs.reset(),
            1 => attrs.set(Attr::BOLD, true),
            2 => attrs.set(Attr::FAINT, true),
            3 => attrs.set(Attr::ITALIC, true),
            4 => attrs.set(Attr::UNDERLINE, true),
            5 | 6 => attrs.set(Attr::BLINK, true),
            7 => attrs.set(Attr::INVERSE, true),
            8 => attrs.set(Attr::HIDDEN, true),
            9 => attrs.set(Attr::STRIKETHROUGH, true),
            21 => attrs.set(Attr::BOLD, false),
            22 => attrs.set(Attr::BOLD | Attr::FAINT, false),
            23 => attrs.set(Attr::ITALIC, false),
            24 => attrs.set(Attr::UNDERLINE, false),
            25 => attrs.set(Attr::BLINK, false),
            27 => attrs.set(Attr::INVERSE, false),
            28 => attrs.set(Attr::HIDDEN, false),
            29 => attrs.set(Attr::STRIKETHROUGH, false),
            30..=37 => attrs.fg = Color::Indexed((param - 30) as u8),
            39 => attrs.fg = Color::Default,
            40..=47 => attrs.bg = Color::Indexed((param - 40) as u8),
            49 => attrs.bg = Color::Default,
            90..=97 => attrs.fg = Color::Indexed((param - 90 + 8) as u8),
            100..=107 => attrs.bg = Color::Indexed((param - 100 + 8) as u8),
            38 | 48 => {
                let color = if params.subparams(i).is_empty() {
                    extended_color_semicolon(params, &mut i)
                } else {
                    extended_color_colon(params.subparams(i))
                };
                if let Some(color) = color {
                    if param == 38 {
                        attrs.fg = color;
                    } else {
                        attrs.bg = color;
                    }
                }
            }
            _ => log::debug!("Unknown SGR parameter {}", param),
        }
        i += 1;
    }
}

/// `38;5;n` / `38;2;r;g;b`; advances `i` past the consumed parameters
fn extended_color_semicolon(params: &Params, i: &mut usize) -> Option<Color> {
    match params.raw(*i + 1) {
        5 if *i + 2 < params.len() => {
            let idx = params.raw(*i + 2) as u8;
            *i += 2;
            Some(Color::Indexed(idx))
        }
        2 if *i + 4 < params.len() => {
            let (r, g, b) = (params.raw(*i + 2), params.raw(*i + 3), params.raw(*i + 4));
            *i += 4;
            Some(Color::Rgb(r as u8, g as u8, b as u8))
        }
        _ => None,
    }
}

/// `38:5:n`, `38:2:r:g:b` and `38:2:colorspace:r:g:b`
fn extended_color_colon(sub: &[u16]) -> Option<Color> {
    match sub {
        [5, idx, ..] => Some(Color::Indexed(*idx as u8)),
        [2, _, r, g, b, ..] => Some(Color::Rgb(*r as u8, *g as u8, *b as u8)),
        [2, r, g, b] => Some(Color::Rgb(*r as u8, *g as u8, *b as u8)),
        _ => None,
    }
}
