bitflags::bitflags! {
    /// Post-processing steps applied to every imported primitive.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct ImportOptions: u32 {
        /// Convert strips and fans into triangle lists.
        const TRIANGULATE = 1 << 0;
        /// Collapse bit-identical vertices and remap indices.
        const WELD_VERTICES = 1 << 1;
        /// Synthesize flat normals for primitives that have none.
        const GENERATE_NORMALS = 1 << 2;
        /// Compute a per-vertex tangent basis from UVs.
        const COMPUTE_TANGENTS = 1 << 3;

        /// The fixed set the viewer imports with.
        const VIEWER = Self::TRIANGULATE.bits()
            | Self::WELD_VERTICES.bits()
            | Self::GENERATE_NORMALS.bits()
            | Self::COMPUTE_TANGENTS.bits();
    }
}

impl Default for ImportOptions {
    fn default() -> Self {
        Self::VIEWER
    }
}
