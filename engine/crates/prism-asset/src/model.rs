//! glTF / GLB 模型导入
//!
//! 只读取三角形 primitive 的 position / normal / uv / index 以及 base color（纹理 + factor），
//! node 的 transform 会被烘焙到顶点中。
//! 多个 material 引用同一个纹理来源（外部文件按路径、内嵌图片按 image 序号）时只上传一次。
//! 内嵌图片既可以放在 buffer view 中，也可以是 base64 编码的 data uri。

use std::collections::HashMap;
use std::hash::Hash;
use std::path::{Path, PathBuf};
use std::rc::Rc;

use base64::Engine;
use glam::{Mat3, Mat4, Vec2, Vec3, Vec4};
use prism_gfx::resources::sampler::GfxSamplerDesc;

use crate::asset::Asset;
use crate::catalog::{CatalogEntry, ModelBinding, ModelId};
use crate::context::GpuUploadContext;
use crate::error::AssetError;
use crate::texture::Rgba8Image;
use crate::upload::GpuTexture;

/// 纹理的来源，用于去重
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TextureKey {
    /// 外部图片，已经相对于模型文件所在目录解析
    Path(PathBuf),
    /// 通过 buffer view 或 data uri 内嵌的图片，值为 image 的序号
    Embedded(usize),
}

#[derive(Debug, Copy, Clone, PartialEq)]
pub struct ModelVertex {
    pub position: Vec3,
    pub normal: Vec3,
    pub uv: Vec2,
}

#[derive(Debug, Clone)]
pub struct ModelPrimitive {
    pub vertices: Vec<ModelVertex>,
    pub indices: Vec<u32>,
    pub base_color: Vec4,
    /// 模型去重之后的纹理序号
    pub texture: Option<usize>,
}

/// 模型的 CPU 数据，mesh renderer 每帧从这里生成顶点
#[derive(Debug, Clone, Default)]
pub struct ModelData {
    pub primitives: Vec<ModelPrimitive>,
    pub texture_count: usize,
}

/// 对纹理引用去重
///
/// 返回 (去重之后的来源列表, 每个引用在列表中的序号)
pub fn unique_texture_sources<K: Clone + Eq + Hash>(refs: &[Option<K>]) -> (Vec<K>, Vec<Option<usize>>) {
    let mut unique = Vec::new();
    let mut lookup: HashMap<K, usize> = HashMap::new();
    let mapping = refs
        .iter()
        .map(|key| {
            key.as_ref().map(|key| {
                *lookup.entry(key.clone()).or_insert_with(|| {
                    unique.push(key.clone());
                    unique.len() - 1
                })
            })
        })
        .collect();
    (unique, mapping)
}

/// 每个 material 的 base color 纹理来源，顺序与 `document.materials()` 一致
fn material_texture_refs(document: &gltf::Document, base_dir: &Path) -> Result<Vec<Option<TextureKey>>, String> {
    document
        .materials()
        .map(|material| {
            let Some(info) = material.pbr_metallic_roughness().base_color_texture() else {
                return Ok(None);
            };
            let image = info.texture().source();
            match image.source() {
                gltf::image::Source::View { .. } => Ok(Some(TextureKey::Embedded(image.index()))),
                gltf::image::Source::Uri { uri, .. } if uri.starts_with("data:") => {
                    Ok(Some(TextureKey::Embedded(image.index())))
                }
                gltf::image::Source::Uri { uri, .. } => Ok(Some(TextureKey::Path(base_dir.join(uri)))),
            }
        })
        .collect()
}

/// 解码 `data:[<mime>];base64,<payload>` 形式的 uri，glTF 只允许 base64 编码
pub fn decode_data_uri(uri: &str) -> Result<Vec<u8>, String> {
    let (header, payload) = uri
        .strip_prefix("data:")
        .and_then(|rest| rest.split_once(','))
        .ok_or_else(|| "malformed data uri".to_string())?;
    if !header.ends_with(";base64") {
        return Err(format!("data uri '{}' is not base64 encoded", header));
    }
    base64::engine::general_purpose::STANDARD.decode(payload).map_err(|e| format!("invalid base64 payload: {}", e))
}

/// 解析默认场景（没有则使用第一个场景）中的所有三角形 primitive
pub fn parse_model(
    document: &gltf::Document,
    buffers: &[gltf::buffer::Data],
    base_dir: &Path,
) -> Result<(ModelData, Vec<TextureKey>), String> {
    let refs = material_texture_refs(document, base_dir)?;
    let (unique, material_to_texture) = unique_texture_sources(&refs);

    let scene = document.default_scene().or_else(|| document.scenes().next()).ok_or("model contains no scene")?;

    let mut primitives = Vec::new();
    let mut stack = scene.nodes().map(|node| (node, Mat4::IDENTITY)).collect::<Vec<_>>();
    while let Some((node, parent)) = stack.pop() {
        // gltf 使用列主序存放矩阵
        let world = parent * Mat4::from_cols_array_2d(&node.transform().matrix());
        if let Some(mesh) = node.mesh() {
            for primitive in mesh.primitives() {
                if primitive.mode() != gltf::mesh::Mode::Triangles {
                    log::warn!("skip non-triangle primitive in mesh {:?}", mesh.name());
                    continue;
                }
                let texture = primitive.material().index().and_then(|idx| material_to_texture[idx]);
                primitives.push(read_primitive(&primitive, buffers, world, texture)?);
            }
        }
        stack.extend(node.children().map(|child| (child, world)));
    }

    Ok((
        ModelData {
            primitives,
            texture_count: unique.len(),
        },
        unique,
    ))
}

fn read_primitive(
    primitive: &gltf::Primitive,
    buffers: &[gltf::buffer::Data],
    world: Mat4,
    texture: Option<usize>,
) -> Result<ModelPrimitive, String> {
    let reader = primitive.reader(|buffer| Some(&buffers[buffer.index()]));

    let positions = reader.read_positions().ok_or("primitive has no POSITION attribute")?.collect::<Vec<_>>();
    let vertex_cnt = positions.len();
    let normals = reader.read_normals().map_or_else(|| vec![[0.0, 0.0, 1.0]; vertex_cnt], Iterator::collect);
    let uvs = reader.read_tex_coords(0).map_or_else(|| vec![[0.0, 0.0]; vertex_cnt], |uv| uv.into_f32().collect());
    if normals.len() != vertex_cnt || uvs.len() != vertex_cnt {
        return Err("primitive attributes have different lengths".to_string());
    }
    let indices = reader
        .read_indices()
        .map_or_else(|| (0..vertex_cnt as u32).collect(), |indices| indices.into_u32().collect::<Vec<_>>());
    if let Some(bad) = indices.iter().find(|&&i| i as usize >= vertex_cnt) {
        return Err(format!("index {} is out of range ({} vertices)", bad, vertex_cnt));
    }

    let normal_matrix = Mat3::from_mat4(world).inverse().transpose();
    let vertices = itertools::izip!(positions, normals, uvs)
        .map(|(p, n, uv)| ModelVertex {
            position: world.transform_point3(Vec3::from(p)),
            normal: (normal_matrix * Vec3::from(n)).normalize_or_zero(),
            uv: Vec2::from(uv),
        })
        .collect();

    Ok(ModelPrimitive {
        vertices,
        indices,
        base_color: Vec4::from(primitive.material().pbr_metallic_roughness().base_color_factor()),
        texture,
    })
}

/// glTF 模型资源
pub struct Model {
    id: ModelId,
    name: String,
    path: PathBuf,

    data: Option<Rc<ModelData>>,
    /// 与 [`ModelData::texture_count`] 一一对应，按上传顺序存放
    textures: Vec<GpuTexture>,
}

// new & init
impl Model {
    pub fn from_file(id: ModelId, path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        Self {
            id,
            name: path.to_string_lossy().into_owned(),
            path,
            data: None,
            textures: Vec::new(),
        }
    }
}

// tools
impl Model {
    fn decode_texture(
        &self,
        key: &TextureKey,
        document: &gltf::Document,
        buffers: &[gltf::buffer::Data],
    ) -> Result<Rgba8Image, AssetError> {
        match key {
            TextureKey::Path(path) => Rgba8Image::decode_file(path),
            TextureKey::Embedded(image_idx) => {
                let image = document
                    .images()
                    .nth(*image_idx)
                    .ok_or_else(|| AssetError::Missing(format!("{}: image {}", self.name, image_idx)))?;
                let to_content_err = |message| AssetError::ModelContent {
                    path: self.path.clone(),
                    message,
                };
                match image.source() {
                    gltf::image::Source::View { view, .. } => {
                        let buffer: &[u8] = &buffers[view.buffer().index()];
                        let bytes = buffer.get(view.offset()..view.offset() + view.length()).ok_or_else(|| {
                            to_content_err(format!("buffer view of image {} is out of range", image_idx))
                        })?;
                        Rgba8Image::decode_memory(bytes, &self.path)
                    }
                    gltf::image::Source::Uri { uri, .. } => {
                        let bytes = decode_data_uri(uri)
                            .map_err(|e| to_content_err(format!("image {}: {}", image_idx, e)))?;
                        Rgba8Image::decode_memory(&bytes, &self.path)
                    }
                }
            }
        }
    }

    fn upload_textures(
        &self,
        ctx: &GpuUploadContext,
        keys: &[TextureKey],
        document: &gltf::Document,
        buffers: &[gltf::buffer::Data],
    ) -> Result<Vec<GpuTexture>, AssetError> {
        let mut textures = Vec::with_capacity(keys.len());
        for (idx, key) in keys.iter().enumerate() {
            let uploaded = self.decode_texture(key, document, buffers).and_then(|image| {
                GpuTexture::upload(
                    ctx,
                    image.extent(),
                    ash::vk::Format::R8G8B8A8_SRGB,
                    &image.pixels,
                    &GfxSamplerDesc::default(),
                    &format!("{}#tex{}", self.name, idx),
                )
            });
            match uploaded {
                Ok(texture) => textures.push(texture),
                Err(e) => {
                    textures.into_iter().rev().for_each(GpuTexture::destroy);
                    return Err(e);
                }
            }
        }
        Ok(textures)
    }
}

impl Asset<GpuUploadContext> for Model {
    fn name(&self) -> &str {
        &self.name
    }

    fn load(&mut self, ctx: &GpuUploadContext) -> Result<(), AssetError> {
        let to_model_err = |source| AssetError::Model {
            path: self.path.clone(),
            source,
        };
        let gltf = gltf::Gltf::open(&self.path).map_err(to_model_err)?;
        // 模型内的相对路径相对于模型文件所在的目录
        let base_dir = self.path.parent().unwrap_or(Path::new("."));
        let buffers =
            gltf::import_buffers(&gltf.document, Some(base_dir), gltf.blob.clone()).map_err(to_model_err)?;

        let (data, keys) = parse_model(&gltf.document, &buffers, base_dir).map_err(|message| {
            AssetError::ModelContent {
                path: self.path.clone(),
                message,
            }
        })?;
        log::info!(
            "model '{}': {} primitives, {} unique textures",
            self.name,
            data.primitives.len(),
            keys.len()
        );

        self.textures = self.upload_textures(ctx, &keys, &gltf.document, &buffers)?;
        self.data = Some(Rc::new(data));
        Ok(())
    }

    fn unload(&mut self, _ctx: &GpuUploadContext) -> Result<(), AssetError> {
        self.data = None;
        self.textures.drain(..).rev().for_each(GpuTexture::destroy);
        Ok(())
    }

    fn is_loaded(&self) -> bool {
        self.data.is_some()
    }

    fn catalog_entry(&self) -> Option<CatalogEntry> {
        let data = self.data.as_ref()?;
        Some(CatalogEntry::Model(
            self.id,
            ModelBinding {
                data: data.clone(),
                textures: self.textures.iter().map(GpuTexture::binding).collect(),
            },
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// 一个三角形（44 字节的 data uri buffer），两个 primitive 分别使用两个 material
    fn model_json(image_a: &str, image_b: &str) -> String {
        format!(
            r#"{{
  "asset": {{ "version": "2.0" }},
  "scene": 0,
  "scenes": [{{ "nodes": [0] }}],
  "nodes": [{{ "mesh": 0, "translation": [2.0, 0.0, 0.0] }}],
  "meshes": [{{ "primitives": [
    {{ "attributes": {{ "POSITION": 0 }}, "indices": 1, "material": 0 }},
    {{ "attributes": {{ "POSITION": 0 }}, "indices": 1, "material": 1 }}
  ] }}],
  "materials": [
    {{ "pbrMetallicRoughness": {{ "baseColorTexture": {{ "index": 0 }} }} }},
    {{ "pbrMetallicRoughness": {{ "baseColorTexture": {{ "index": 1 }}, "baseColorFactor": [1.0, 0.0, 0.0, 1.0] }} }}
  ],
  "textures": [{{ "source": 0 }}, {{ "source": 1 }}],
  "images": [{{ "uri": "{image_a}" }}, {{ "uri": "{image_b}" }}],
  "accessors": [
    {{ "bufferView": 0, "componentType": 5126, "count": 3, "type": "VEC3", "min": [0.0, 0.0, 0.0], "max": [1.0, 1.0, 0.0] }},
    {{ "bufferView": 1, "componentType": 5123, "count": 3, "type": "SCALAR" }}
  ],
  "bufferViews": [
    {{ "buffer": 0, "byteOffset": 0, "byteLength": 36 }},
    {{ "buffer": 0, "byteOffset": 36, "byteLength": 6 }}
  ],
  "buffers": [{{ "byteLength": 44, "uri": "data:application/octet-stream;base64,AAAAAAAAAAAAAAAAAACAPwAAAAAAAAAAAAAAAAAAgD8AAAAAAAABAAIAAAA=" }}]
}}"#
        )
    }

    fn parse(json: &str) -> (ModelData, Vec<TextureKey>) {
        let gltf = gltf::Gltf::from_slice(json.as_bytes()).unwrap();
        let buffers = gltf::import_buffers(&gltf.document, None, None).unwrap();
        parse_model(&gltf.document, &buffers, Path::new("models")).unwrap()
    }

    #[test]
    fn test_unique_texture_sources() {
        let (unique, mapping) = unique_texture_sources(&[Some("a"), None, Some("b"), Some("a")]);
        assert_eq!(unique, vec!["a", "b"]);
        assert_eq!(mapping, vec![Some(0), None, Some(1), Some(0)]);
    }

    #[test]
    fn test_shared_texture_path_is_uploaded_once() {
        let (data, keys) = parse(&model_json("albedo.png", "albedo.png"));
        assert_eq!(keys, vec![TextureKey::Path(Path::new("models").join("albedo.png"))]);
        assert_eq!(data.texture_count, 1);
        assert!(data.primitives.iter().all(|p| p.texture == Some(0)));
    }

    #[test]
    fn test_distinct_texture_paths() {
        let (data, keys) = parse(&model_json("a.png", "b.png"));
        assert_eq!(keys.len(), 2);
        let textures = data.primitives.iter().map(|p| p.texture).collect::<Vec<_>>();
        assert_eq!(textures, vec![Some(0), Some(1)]);
    }

    #[test]
    fn test_node_transform_is_baked() {
        let (data, _) = parse(&model_json("a.png", "a.png"));
        let primitive = &data.primitives[0];
        assert_eq!(primitive.indices, vec![0, 1, 2]);
        assert_eq!(primitive.vertices[1].position, Vec3::new(3.0, 0.0, 0.0));
        assert_eq!(primitive.vertices[0].normal, Vec3::Z);
        assert_eq!(data.primitives[1].base_color, Vec4::new(1.0, 0.0, 0.0, 1.0));
    }

    /// 1x1 的红色 png
    const RED_PIXEL_PNG: &str = "data:image/png;base64,iVBORw0KGgoAAAANSUhEUgAAAAEAAAABCAYAAAAfFcSJAAAADUlEQVR4nGP4z8DwHwAFAAH/iZk9HQAAAABJRU5ErkJggg==";

    #[test]
    fn test_inline_images_are_keyed_by_index() {
        let (data, keys) = parse(&model_json(RED_PIXEL_PNG, "b.png"));
        assert_eq!(keys, vec![TextureKey::Embedded(0), TextureKey::Path(Path::new("models").join("b.png"))]);
        assert_eq!(data.texture_count, 2);
    }

    #[test]
    fn test_data_uri_image_decodes() {
        let bytes = decode_data_uri(RED_PIXEL_PNG).unwrap();
        let image = Rgba8Image::decode_memory(&bytes, Path::new("inline.gltf")).unwrap();
        assert_eq!((image.width, image.height), (1, 1));
        assert_eq!(image.pixels, vec![255, 0, 0, 255]);
    }

    #[test]
    fn test_malformed_data_uri_is_rejected() {
        assert!(decode_data_uri("data:image/png,rawbytes").is_err());
        assert!(decode_data_uri("data:image/png;base64").is_err());
        assert!(decode_data_uri("data:image/png;base64,@@@").is_err());
    }
}
