/// Cantor pairing of two integers into one. Order-preserving in `b` for a
/// fixed `a`, and injective only when both are non-negative.
#[inline]
pub fn cantor_pairing(a: i128, b: i128) -> i128 {
    (a + b) * (a + b + 1) / 2 + b
}

/// Residue identity within a chain: a sequence number plus an optional
/// insertion code.
///
/// Short insertion codes are folded into one integer so most keys hash as
/// integers. Keeping the variants distinct means a bare sequence number can
/// never collide with a paired key.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ResidueKey {
    Plain(i32),
    Paired(i128),
    Text(String),
}

impl ResidueKey {
    pub fn new(seq_id: i32, ins_code: &str) -> Self {
        // Shifted to be non-negative so the pairing stays injective.
        let seq = i128::from(seq_id) - i128::from(i32::MIN);
        let mut chars = ins_code.chars();
        match (chars.next(), chars.next(), chars.next()) {
            (None, _, _) => ResidueKey::Plain(seq_id),
            (Some(c0), None, _) => {
                ResidueKey::Paired(cantor_pairing(i128::from(u32::from(c0)), seq))
            }
            (Some(c0), Some(c1), None) => ResidueKey::Paired(cantor_pairing(
                i128::from(u32::from(c0)),
                cantor_pairing(i128::from(u32::from(c1)), seq),
            )),
            _ => ResidueKey::Text(format!("{seq_id} {ins_code}")),
        }
    }
}
