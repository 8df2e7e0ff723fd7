//! `free`/`skip` padding boxes, `wide` (a `free` box reserving space for a 64-bit `mdat` size),
//! and the generic `uuid` extension box.

/// `free`/`skip`: arbitrary padding, contents ignored.
pub struct FreeBox<'buf> {
    pub data: &'buf [u8],
}
impl<'buf> FreeBox<'buf> {
    pub fn parse(payload: &'buf [u8]) -> FreeBox<'buf> {
        FreeBox { data: payload }
    }
}

/// `wide`: reserved space, always empty in practice.
pub struct WideBox<'buf> {
    pub data: &'buf [u8],
}
impl<'buf> WideBox<'buf> {
    pub fn parse(payload: &'buf [u8]) -> WideBox<'buf> {
        WideBox { data: payload }
    }
}

/// `uuid`: vendor-extension box identified by a 16-byte `user_type` on the header rather than
/// by its four-character type.
pub struct UuidBox<'buf> {
    pub user_type: Option<[u8; 16]>,
    pub data: &'buf [u8],
}
impl<'buf> UuidBox<'buf> {
    pub fn parse(user_type: Option<[u8; 16]>, payload: &'buf [u8]) -> UuidBox<'buf> {
        UuidBox {
            user_type,
            data: payload,
        }
    }
}
