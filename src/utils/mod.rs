use derive_more::{DebugCustom, Deref, DerefMut, Display, From, Into};

/// Float newtype rounded to 1e-10 so it can back an `Eq`/`Hash` evaluation vector.
#[derive(From, Into, Deref, DerefMut, DebugCustom, Display, PartialEq, PartialOrd, Clone, Copy)]
#[debug(fmt = "{:?}", _0)]
#[display(fmt = "{:?}", _0)]
pub struct F64(pub f64);

impl F64 {
    pub fn new(value: f64) -> Self {
        Self((value * 1e10).round() / 1e10)
    }
}

impl Eq for F64 {}

impl std::hash::Hash for F64 {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.0.to_bits().hash(state)
    }
}

impl Default for F64 {
    fn default() -> Self {
        F64(0.0)
    }
}
