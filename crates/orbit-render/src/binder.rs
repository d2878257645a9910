use orbit_assets::MaterialRole;

use crate::backend::{DrawTarget, GpuDevice};
use crate::error::RenderError;
use crate::resources::{GpuMaterial, GpuResourceManager};

/// Where a material role is bound and what the shader calls it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TextureSlot {
    pub role: MaterialRole,
    pub unit: u32,
    pub uniform: &'static str,
}

/// Role → texture unit → sampler name, in binding order.
pub const TEXTURE_SLOTS: [TextureSlot; 4] = [
    TextureSlot {
        role: MaterialRole::Diffuse,
        unit: 0,
        uniform: "diffuse_map",
    },
    TextureSlot {
        role: MaterialRole::Specular,
        unit: 1,
        uniform: "specular_map",
    },
    TextureSlot {
        role: MaterialRole::Normal,
        unit: 2,
        uniform: "normal_map",
    },
    TextureSlot {
        role: MaterialRole::Emissive,
        unit: 3,
        uniform: "emissive_map",
    },
];

/// Binds a material's textures before a draw.
pub struct MaterialBinder;

impl MaterialBinder {
    /// Bind every slot of `material`.
    ///
    /// Roles without a live texture are bound as `None` so no unit keeps a
    /// texture from an earlier draw. The target then receives a mask with bit
    /// `unit` set for each unit that got a real texture.
    pub fn bind<D, T>(
        target: &mut T,
        resources: &GpuResourceManager<D>,
        material: &GpuMaterial,
    ) -> Result<(), RenderError>
    where
        D: GpuDevice,
        T: DrawTarget<D> + ?Sized,
    {
        let mut mask = 0;
        for slot in &TEXTURE_SLOTS {
            let texture = resources.texture(material.texture(slot.role));
            if texture.is_some() {
                mask |= 1 << slot.unit;
            }
            target.bind_texture(slot.unit, texture)?;
        }
        target.set_texture_mask(mask)
    }
}
