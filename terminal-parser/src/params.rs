//! CSI parameter parsing
//!
//! Parameters are separated by `;`; a parameter may carry `:`-separated
//! subparameters (as in `38:2:r:g:b`). Empty positions read as 0, which
//! callers treat as "use the default".

/// Maximum number of parameters we'll track
const MAX_PARAMS: usize = 32;

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Params {
    /// Every number in order, subparameters included
    values: Vec<u16>,
    /// Index into `values` where each parameter starts
    starts: Vec<usize>,
}

impl Params {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_slice(values: &[u16]) -> Self {
        Self {
            values: values.to_vec(),
            starts: (0..values.len()).collect(),
        }
    }

    pub fn parse(bytes: &[u8]) -> Self {
        let mut params = Self::new();
        if bytes.is_empty() {
            return params;
        }
        let mut current: u16 = 0;
        params.starts.push(0);

        for &byte in bytes {
            match byte {
                b'0'..=b'9' => {
                    current = current.saturating_mul(10).saturating_add((byte - b'0') as u16);
                }
                b':' => {
                    params.values.push(current);
                    current = 0;
                }
                b';' => {
                    params.values.push(current);
                    current = 0;
                    if params.starts.len() == MAX_PARAMS {
                        return params;
                    }
                    params.starts.push(params.values.len());
                }
                _ => {}
            }
        }
        params.values.push(current);
        params
    }

    /// Parameter at `index`; `None` if absent or 0 (default)
    pub fn get(&self, index: usize) -> Option<u16> {
        Some(self.raw(index)).filter(|&v| v != 0)
    }

    /// Raw value at `index` (0 if not present)
    pub fn raw(&self, index: usize) -> u16 {
        self.starts
            .get(index)
            .and_then(|&start| self.values.get(start))
            .copied()
            .unwrap_or(0)
    }

    pub fn len(&self) -> usize {
        self.starts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.starts.is_empty()
    }

    /// The `:`-separated values following parameter `index`
    pub fn subparams(&self, index: usize) -> &[u16] {
        let Some(&start) = self.starts.get(index) else {
            return &[];
        };
        let end = self.starts.get(index + 1).copied().unwrap_or(self.values.len());
        self.values.get(start + 1..end).unwrap_or(&[])
    }

    pub fn iter(&self) -> impl Iterator<Item = u16> + '_ {
        (0..self.len()).map(move |i| self.raw(i))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_params_empty() {
        assert!(Params::parse(b"").is_empty());
    }

    #[test]
    fn test_params_multiple() {
        let params = Params::parse(b"1;2;3");
        assert_eq!(params.len(), 3);
        assert_eq!(params.iter().collect::<Vec<_>>(), vec![1, 2, 3]);
    }

    #[test]
    fn test_params_default() {
        let params = Params::parse(b";5;");
        assert_eq!(params.len(), 3);
        assert_eq!(params.get(0), None);
        assert_eq!(params.get(1), Some(5));
        assert_eq!(params.get(2), None);
        assert_eq!(params.raw(0), 0);
    }

    #[test]
    fn test_params_overflow_saturates() {
        assert_eq!(Params::parse(b"99999").get(0), Some(65535));
    }

    #[test]
    fn test_params_subparams() {
        let params = Params::parse(b"1;38:2:255:128:64;4");
        assert_eq!(params.len(), 3);
        assert_eq!(params.raw(1), 38);
        assert_eq!(params.subparams(1), &[2, 255, 128, 64]);
        assert!(params.subparams(0).is_empty());
        assert_eq!(params.raw(2), 4);
        assert!(params.subparams(9).is_empty());
    }

    #[test]
    fn test_params_capped() {
        let input = "1;".repeat(100);
        assert_eq!(Params::parse(input.as_bytes()).len(), MAX_PARAMS);
    }
}
