use std::marker::PhantomData;

/// Raw id behind a GPU handle. `0` is never allocated.
pub type HandleId = u64;

/// A typed handle referencing a resource owned by a `GpuResourceManager`.
#[derive(Debug)]
pub struct GpuHandle<T> {
    id: HandleId,
    _marker: PhantomData<T>,
}

impl<T> GpuHandle<T> {
    /// The "nothing bound" sentinel.
    pub const NONE: Self = Self {
        id: 0,
        _marker: PhantomData,
    };

    pub(crate) fn new(id: HandleId) -> Self {
        debug_assert_ne!(id, 0, "id 0 is reserved for the sentinel");
        Self {
            id,
            _marker: PhantomData,
        }
    }

    /// The unique ID of this resource.
    pub fn id(&self) -> HandleId {
        self.id
    }

    pub fn is_none(&self) -> bool {
        self.id == 0
    }
}

impl<T> Default for GpuHandle<T> {
    fn default() -> Self {
        Self::NONE
    }
}

impl<T> Clone for GpuHandle<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for GpuHandle<T> {}

impl<T> PartialEq for GpuHandle<T> {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl<T> Eq for GpuHandle<T> {}

impl<T> std::hash::Hash for GpuHandle<T> {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

#[derive(Debug)]
pub struct VertexBufferTag;

#[derive(Debug)]
pub struct IndexBufferTag;

#[derive(Debug)]
pub struct TextureTag;

pub type VertexBufferHandle = GpuHandle<VertexBufferTag>;
pub type IndexBufferHandle = GpuHandle<IndexBufferTag>;
pub type TextureHandle = GpuHandle<TextureTag>;
