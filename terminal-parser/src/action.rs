//! Terminal actions produced by the parser
//!
//! These carry the syntax of each sequence only; what a sequence means is
//! decided by whoever consumes the actions.

use crate::params::Params;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    /// Print a character to the screen
    Print(char),

    /// Execute a C0 control (BEL, BS, HT, LF, VT, FF, CR, ...)
    Execute(u8),

    /// ESC sequence (non-CSI)
    Esc(EscAction),

    /// CSI (Control Sequence Introducer) sequence
    Csi(CsiAction),

    /// OSC (Operating System Command): `command ; argument`
    Osc { command: u16, argument: String },

    /// DCS (Device Control String), consumed but not interpreted here
    Dcs {
        params: Params,
        intermediates: Vec<u8>,
        final_byte: u8,
        data: String,
    },

    /// Syntactically complete but unusable sequence, kept for diagnostics
    Invalid(Vec<u8>),
}

/// ESC sequence actions (non-CSI)
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EscAction {
    /// ESC 7 - DECSC
    SaveCursor,
    /// ESC 8 - DECRC
    RestoreCursor,
    /// ESC D - IND
    Index,
    /// ESC M - RI
    ReverseIndex,
    /// ESC E - NEL
    NextLine,
    /// ESC H - HTS
    HorizontalTabSet,
    /// ESC c - RIS
    FullReset,
    /// ESC = - DECKPAM
    ApplicationKeypad,
    /// ESC > - DECKPNM
    NormalKeypad,
    /// Anything else: intermediates followed by the final byte
    Unknown(Vec<u8>),
}

impl EscAction {
    pub(crate) fn from_final(intermediates: &[u8], final_byte: u8) -> Self {
        if !intermediates.is_empty() {
            let mut raw = intermediates.to_vec();
            raw.push(final_byte);
            return EscAction::Unknown(raw);
        }
        match final_byte {
            b'7' => EscAction::SaveCursor,
            b'8' => EscAction::RestoreCursor,
            b'D' => EscAction::Index,
            b'M' => EscAction::ReverseIndex,
            b'E' => EscAction::NextLine,
            b'H' => EscAction::HorizontalTabSet,
            b'c' => EscAction::FullReset,
            b'=' => EscAction::ApplicationKeypad,
            b'>' => EscAction::NormalKeypad,
            other => EscAction::Unknown(vec![other]),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CsiAction {
    pub params: Params,
    /// Intermediate bytes (0x20-0x2F)
    pub intermediates: Vec<u8>,
    /// Final byte (0x40-0x7E)
    pub final_byte: u8,
    /// Leading marker: 0 for none, or one of `?`, `>`, `<`, `=`
    pub marker: u8,
}

impl CsiAction {
    /// Parameter at `index`, with `default` for missing or zero values
    pub fn param(&self, index: usize, default: u16) -> u16 {
        self.params.get(index).unwrap_or(default)
    }

    pub fn is_private(&self) -> bool {
        self.marker == b'?'
    }

    /// Plain `CSI ... final` with no marker or intermediates
    pub fn is(&self, final_byte: u8) -> bool {
        self.final_byte == final_byte && self.intermediates.is_empty() && self.marker == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn csi(params: &[u16], marker: u8) -> CsiAction {
        CsiAction {
            params: Params::from_slice(params),
            intermediates: vec![],
            final_byte: b'H',
            marker,
        }
    }

    #[test]
    fn test_csi_action_param() {
        let csi = csi(&[10, 0, 30], 0);
        assert_eq!(csi.param(0, 1), 10);
        assert_eq!(csi.param(1, 1), 1);
        assert_eq!(csi.param(5, 99), 99);
    }

    #[test]
    fn test_csi_action_is() {
        assert!(csi(&[], 0).is(b'H'));
        assert!(!csi(&[], 0).is(b'J'));
        assert!(!csi(&[], b'?').is(b'H'));
        assert!(csi(&[], b'?').is_private());
    }

    #[test]
    fn test_esc_from_final() {
        assert_eq!(EscAction::from_final(&[], b'7'), EscAction::SaveCursor);
        assert_eq!(EscAction::from_final(&[b'('], b'B'), EscAction::Unknown(vec![b'(', b'B']));
        assert_eq!(EscAction::from_final(&[], b'Z'), EscAction::Unknown(vec![b'Z']));
    }
}
