use std::path::{Path, PathBuf};

use gltf::image::Source;
use gltf::mesh::Mode;
use tracing::{debug, warn};

use crate::error::ImportError;
use crate::geometry::{self, RawPrimitive, SubMesh, Topology};
use crate::material::{Material, MaterialRole, TextureRef};
use crate::merge;
use crate::mesh::MeshRecord;
use crate::options::ImportOptions;

/// Everything the renderer needs from a model file.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ImportedModel {
    /// One record per distinct material, in first-appearance order.
    pub meshes: Vec<MeshRecord>,
    /// Indexed by [`MeshRecord::material`].
    pub materials: Vec<Material>,
}

impl ImportedModel {
    /// A model with nothing to draw.
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.meshes.is_empty()
    }

    pub fn vertex_count(&self) -> usize {
        self.meshes.iter().map(MeshRecord::vertex_count).sum()
    }

    pub fn index_count(&self) -> usize {
        self.meshes.iter().map(MeshRecord::index_count).sum()
    }

    /// Material of a mesh record, if the slot exists.
    pub fn material_of(&self, mesh: &MeshRecord) -> Option<&Material> {
        self.materials.get(mesh.material)
    }
}

/// Import a glTF 2.0 file (.gltf or .glb).
///
/// Every primitive goes through the post-processing in `options`, then
/// primitives sharing a material are merged. Any failure discards the whole
/// model.
pub fn import_model(path: &Path, options: ImportOptions) -> Result<ImportedModel, ImportError> {
    if !path.exists() {
        return Err(ImportError::NotFound(path.to_path_buf()));
    }

    let gltf::Gltf { document, blob } = gltf::Gltf::open(path)
        .map_err(|e| ImportError::GltfLoadFailed(path.to_path_buf(), e.to_string()))?;
    let buffers = gltf::import_buffers(&document, path.parent(), blob)
        .map_err(|e| ImportError::GltfLoadFailed(path.to_path_buf(), e.to_string()))?;

    // Slot i holds the glTF material index of the i-th distinct material seen.
    let mut slots: Vec<Option<usize>> = Vec::new();
    let mut sub_meshes: Vec<(usize, SubMesh)> = Vec::new();

    for mesh in document.meshes() {
        let name = mesh.name().unwrap_or("unnamed");

        for primitive in mesh.primitives() {
            let reader = primitive.reader(|buffer| Some(&buffers[buffer.index()]));

            let Some(positions) = reader.read_positions() else {
                warn!("Mesh '{}' has a primitive without positions, skipping", name);
                continue;
            };
            let positions: Vec<[f32; 3]> = positions.collect();

            let normals: Option<Vec<[f32; 3]>> = reader.read_normals().map(|iter| iter.collect());

            let uvs: Option<Vec<[f32; 2]>> = reader
                .read_tex_coords(0)
                .map(|tc| tc.into_f32().collect());

            let indices: Vec<u32> = reader
                .read_indices()
                .map(|idx| idx.into_u32().collect())
                .unwrap_or_else(|| (0..positions.len() as u32).collect());

            let raw = RawPrimitive {
                positions,
                normals,
                uvs,
                indices,
                topology: Some(topology(primitive.mode())),
            };

            let Some(sub) = geometry::process(raw, options)? else {
                warn!(
                    "Mesh '{}': {:?} primitive has no triangles, skipping",
                    name,
                    primitive.mode()
                );
                continue;
            };

            let material = primitive.material().index();
            let slot = match slots.iter().position(|&m| m == material) {
                Some(slot) => slot,
                None => {
                    slots.push(material);
                    slots.len() - 1
                }
            };
            sub_meshes.push((slot, sub));
        }
    }

    if sub_meshes.is_empty() {
        return Err(ImportError::NoGeometry(path.to_path_buf()));
    }

    let meshes = merge::group_by_material(
        sub_meshes,
        options.contains(ImportOptions::COMPUTE_TANGENTS),
    );

    let materials = slots
        .into_iter()
        .map(|slot| {
            slot.and_then(|index| document.materials().nth(index))
                .map(|material| read_material(&material, &buffers))
                .unwrap_or_else(|| Material::new("default"))
        })
        .collect();

    let model = ImportedModel { meshes, materials };
    debug!(
        "glTF '{}': {} mesh records, {} vertices, {} indices",
        path.display(),
        model.meshes.len(),
        model.vertex_count(),
        model.index_count()
    );

    Ok(model)
}

fn topology(mode: Mode) -> Topology {
    match mode {
        Mode::Triangles => Topology::Triangles,
        Mode::TriangleStrip => Topology::TriangleStrip,
        Mode::TriangleFan => Topology::TriangleFan,
        Mode::Lines | Mode::LineLoop | Mode::LineStrip => Topology::Lines,
        Mode::Points => Topology::Points,
    }
}

fn read_material(material: &gltf::Material<'_>, buffers: &[gltf::buffer::Data]) -> Material {
    let mut out = Material::new(material.name().unwrap_or("unnamed"));

    let diffuse = material
        .pbr_metallic_roughness()
        .base_color_texture()
        .map(|info| info.texture());
    let specular = material
        .specular()
        .and_then(|specular| specular.specular_texture())
        .map(|info| info.texture());
    let normal = material.normal_texture().map(|tex| tex.texture());
    let emissive = material.emissive_texture().map(|info| info.texture());

    for (role, texture) in [
        (MaterialRole::Diffuse, diffuse),
        (MaterialRole::Specular, specular),
        (MaterialRole::Normal, normal),
        (MaterialRole::Emissive, emissive),
    ] {
        if let Some(texture) = texture {
            out.set_texture(role, texture_ref(&texture, buffers));
        }
    }

    out
}

fn texture_ref(texture: &gltf::Texture<'_>, buffers: &[gltf::buffer::Data]) -> Option<TextureRef> {
    match texture.source().source() {
        Source::Uri { uri, .. } if uri.starts_with("data:") => {
            warn!("Inline data URI textures are not supported, skipping");
            None
        }
        Source::Uri { uri, .. } => Some(TextureRef::Path(PathBuf::from(uri))),
        Source::View { view, mime_type } => {
            let buffer = buffers.get(view.buffer().index())?;
            let start = view.offset();
            let bytes = buffer.get(start..start + view.length())?;
            Some(TextureRef::Embedded {
                data: bytes.to_vec(),
                mime_type: mime_type.to_string(),
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    const TRIANGLE_GLTF: &str = r#"{
        "asset": { "version": "2.0" },
        "buffers": [{ "uri": "triangle.bin", "byteLength": 48 }],
        "bufferViews": [
            { "buffer": 0, "byteOffset": 0, "byteLength": 36, "target": 34962 },
            { "buffer": 0, "byteOffset": 36, "byteLength": 12, "target": 34963 }
        ],
        "accessors": [
            { "bufferView": 0, "componentType": 5126, "count": 3, "type": "VEC3",
              "min": [0.0, 0.0, 0.0], "max": [1.0, 1.0, 0.0] },
            { "bufferView": 1, "componentType": 5125, "count": 3, "type": "SCALAR" }
        ],
        "images": [{ "uri": "albedo.png" }],
        "textures": [{ "source": 0 }],
        "materials": [{
            "name": "painted",
            "pbrMetallicRoughness": { "baseColorTexture": { "index": 0 } }
        }],
        "meshes": [
            { "primitives": [{ "attributes": { "POSITION": 0 }, "indices": 1, "material": 0 }] },
            { "primitives": [
                { "attributes": { "POSITION": 0 }, "indices": 1 },
                { "attributes": { "POSITION": 0 }, "indices": 1, "material": 0 }
            ] }
        ]
    }"#;

    fn scratch_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("orbit-assets-{}-{}", name, std::process::id()));
        fs::create_dir_all(&dir).unwrap();
        dir
    }

    fn write_triangle_buffer(dir: &Path) {
        let mut bytes = Vec::with_capacity(48);
        for p in [[0.0f32, 0.0, 0.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]] {
            for c in p {
                bytes.extend_from_slice(&c.to_le_bytes());
            }
        }
        for i in [0u32, 1, 2] {
            bytes.extend_from_slice(&i.to_le_bytes());
        }
        fs::write(dir.join("triangle.bin"), bytes).unwrap();
    }

    #[test]
    fn missing_file_returns_not_found() {
        let result = import_model(Path::new("/nonexistent/model.gltf"), ImportOptions::VIEWER);
        assert!(matches!(result, Err(ImportError::NotFound(_))));
    }

    #[test]
    fn malformed_file_fails_to_load() {
        let dir = scratch_dir("malformed");
        let path = dir.join("broken.gltf");
        fs::write(&path, "{ not json").unwrap();
        let result = import_model(&path, ImportOptions::VIEWER);
        assert!(matches!(result, Err(ImportError::GltfLoadFailed(..))));
    }

    #[test]
    fn primitives_are_grouped_by_material() {
        let dir = scratch_dir("grouped");
        write_triangle_buffer(&dir);
        let path = dir.join("triangle.gltf");
        fs::write(&path, TRIANGLE_GLTF).unwrap();

        let model = import_model(&path, ImportOptions::VIEWER).unwrap();
        assert_eq!(model.meshes.len(), 2);
        assert_eq!(model.materials.len(), 2);

        let painted = &model.meshes[0];
        assert_eq!(painted.vertex_count(), 6);
        assert_eq!(painted.indices, vec![0, 1, 2, 3, 4, 5]);
        assert_eq!(painted.tangents.len(), 6);
        assert!(painted.indices_in_bounds());
        // No normals in the file, so flat ones were generated.
        assert!(painted.vertices.iter().all(|v| v.normal == [0.0, 0.0, 1.0]));

        let material = model.material_of(painted).unwrap();
        assert_eq!(material.name, "painted");
        assert_eq!(
            material.texture(MaterialRole::Diffuse),
            Some(&TextureRef::Path(PathBuf::from("albedo.png")))
        );
        assert!(material.texture(MaterialRole::Normal).is_none());

        let plain = &model.meshes[1];
        assert_eq!(plain.vertex_count(), 3);
        assert_eq!(model.material_of(plain).unwrap().texture_count(), 0);
    }

    #[test]
    fn points_only_model_has_no_geometry() {
        let dir = scratch_dir("points");
        write_triangle_buffer(&dir);
        let path = dir.join("points.gltf");
        let json = TRIANGLE_GLTF.replace(r#""indices": 1"#, r#""indices": 1, "mode": 0"#);
        fs::write(&path, json).unwrap();

        let result = import_model(&path, ImportOptions::VIEWER);
        assert!(matches!(result, Err(ImportError::NoGeometry(_))), "{:?}", result);
    }

    #[test]
    fn buffer_view_image_is_embedded() {
        const IMAGE: [u8; 8] = [0x89, b'P', b'N', b'G', 1, 2, 3, 4];

        let dir = scratch_dir("embedded");
        let mut bytes = Vec::new();
        for p in [[0.0f32, 0.0, 0.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]] {
            for c in p {
                bytes.extend_from_slice(&c.to_le_bytes());
            }
        }
        for i in [0u32, 1, 2] {
            bytes.extend_from_slice(&i.to_le_bytes());
        }
        bytes.extend_from_slice(&IMAGE);
        fs::write(dir.join("textured.bin"), bytes).unwrap();

        let json = TRIANGLE_GLTF
            .replace(
                r#"{ "uri": "triangle.bin", "byteLength": 48 }"#,
                r#"{ "uri": "textured.bin", "byteLength": 56 }"#,
            )
            .replace(
                r#"{ "buffer": 0, "byteOffset": 36, "byteLength": 12, "target": 34963 }"#,
                r#"{ "buffer": 0, "byteOffset": 36, "byteLength": 12, "target": 34963 },
            { "buffer": 0, "byteOffset": 48, "byteLength": 8 }"#,
            )
            .replace(
                r#""images": [{ "uri": "albedo.png" }]"#,
                r#""images": [{ "bufferView": 2, "mimeType": "image/png" }]"#,
            );
        let path = dir.join("textured.gltf");
        fs::write(&path, json).unwrap();

        let model = import_model(&path, ImportOptions::VIEWER).unwrap();
        let material = model.material_of(&model.meshes[0]).unwrap();
        assert_eq!(
            material.texture(MaterialRole::Diffuse),
            Some(&TextureRef::Embedded {
                data: IMAGE.to_vec(),
                mime_type: "image/png".to_string(),
            })
        );
    }

    #[test]
    fn data_uri_image_is_skipped() {
        let dir = scratch_dir("data-uri");
        write_triangle_buffer(&dir);
        let json = TRIANGLE_GLTF.replace(
            r#""images": [{ "uri": "albedo.png" }]"#,
            r#""images": [{ "uri": "data:image/png;base64,iVBORw0KGgo=" }]"#,
        );
        let path = dir.join("inline.gltf");
        fs::write(&path, json).unwrap();

        let model = import_model(&path, ImportOptions::VIEWER).unwrap();
        let material = model.material_of(&model.meshes[0]).unwrap();
        assert_eq!(material.name, "painted");
        assert!(material.texture(MaterialRole::Diffuse).is_none());
        assert_eq!(material.texture_count(), 0);
    }
}
