use std::path::PathBuf;

/// The four texture roles a material can carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MaterialRole {
    Diffuse,
    Specular,
    Normal,
    Emissive,
}

impl MaterialRole {
    /// All roles, in texture-unit order.
    pub const ALL: [MaterialRole; 4] = [
        MaterialRole::Diffuse,
        MaterialRole::Specular,
        MaterialRole::Normal,
        MaterialRole::Emissive,
    ];

    /// Position of this role in [`MaterialRole::ALL`].
    pub fn index(self) -> usize {
        match self {
            MaterialRole::Diffuse => 0,
            MaterialRole::Specular => 1,
            MaterialRole::Normal => 2,
            MaterialRole::Emissive => 3,
        }
    }
}

/// Where a material's texture comes from.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TextureRef {
    /// A file, relative to the texture directory unless absolute.
    Path(PathBuf),
    /// Encoded image bytes stored inside the model file.
    Embedded {
        data: Vec<u8>,
        mime_type: String,
    },
}

impl TextureRef {
    /// Short human-readable label for logs.
    pub fn label(&self) -> String {
        match self {
            TextureRef::Path(path) => path.display().to_string(),
            TextureRef::Embedded { data, mime_type } => {
                format!("<embedded {} ({} bytes)>", mime_type, data.len())
            }
        }
    }
}

/// Texture references for one material, at most one per role.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Material {
    pub name: String,
    textures: [Option<TextureRef>; 4],
}

impl Material {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            textures: Default::default(),
        }
    }

    pub fn texture(&self, role: MaterialRole) -> Option<&TextureRef> {
        self.textures[role.index()].as_ref()
    }

    pub fn set_texture(&mut self, role: MaterialRole, texture: Option<TextureRef>) {
        self.textures[role.index()] = texture;
    }

    /// Builder form of [`Material::set_texture`].
    pub fn with_texture(mut self, role: MaterialRole, texture: TextureRef) -> Self {
        self.set_texture(role, Some(texture));
        self
    }

    /// Every role with its reference, present or not.
    pub fn textures(&self) -> impl Iterator<Item = (MaterialRole, Option<&TextureRef>)> {
        MaterialRole::ALL
            .into_iter()
            .map(|role| (role, self.texture(role)))
    }

    /// Number of roles that carry a texture.
    pub fn texture_count(&self) -> usize {
        self.textures.iter().flatten().count()
    }
}
