//! Orbit Assets - model import and texture decoding
//!
//! Imports glTF 2.0 scenes into renderer-agnostic [`MeshRecord`]s and
//! [`Material`]s. Sub-meshes sharing a material are merged into one indexed
//! buffer; texture references are recorded but decoded separately.

mod error;
mod geometry;
mod importer;
mod material;
mod merge;
mod mesh;
mod options;
mod server;
mod texture;

pub use error::{ImportError, TextureDecodeError};
pub use geometry::{RawPrimitive, SubMesh, Topology};
pub use importer::{import_model, ImportedModel};
pub use material::{Material, MaterialRole, TextureRef};
pub use merge::{group_by_material, merge_sub_meshes};
pub use mesh::{MeshRecord, Vertex};
pub use options::ImportOptions;
pub use server::AssetServer;
pub use texture::{decode_bytes, decode_file, decode_texture, DecodedImage, TextureFormat};
