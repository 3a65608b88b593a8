/// Scene import: reading geometry out of scene files.
///
/// A `SceneImporter` turns the bytes of a scene file into plain vertex
/// channels and triangle lists (`ImportedMesh`). `post_process` then fills in
/// whatever the file did not provide (normals, UVs, tangent space) and
/// deduplicates vertices, driven by `PostProcess` flags.
///
/// The default backend is `GltfSceneImporter` (glTF 2.0, `.gltf` or `.glb`).

use bitflags::bitflags;
use glam::Vec3;
use mikktspace::{generate_tangents, Geometry};
use rustc_hash::FxHashMap;

use crate::error::{Error, Result};
use crate::resource::resource_loader::ResourceFile;

bitflags! {
    /// Post-processing steps applied to imported meshes
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct PostProcess: u32 {
        /// Split triangle strips and fans into triangle lists
        const TRIANGULATE = 1 << 0;
        /// Generate smooth normals when the mesh has none
        const GEN_NORMALS = 1 << 1;
        /// Compute tangents and bitangents (requires normals and UVs)
        const CALC_TANGENT_SPACE = 1 << 2;
        /// Merge vertices whose channels are all bitwise identical
        const JOIN_IDENTICAL_VERTICES = 1 << 3;
        /// Drop point and line primitives instead of failing on them
        const SORT_BY_PTYPE = 1 << 4;
        /// Generate planar UVs when the mesh has none
        const GEN_UV_COORDS = 1 << 5;
        /// Accepted for compatibility; texture transforms are not applied
        const TRANSFORM_UV_COORDS = 1 << 6;
        /// Flip the V coordinate (`v = 1 - v`)
        const FLIP_UVS = 1 << 7;

        /// Steps used when importing models
        const MODEL_DEFAULT = Self::TRIANGULATE.bits()
            | Self::GEN_NORMALS.bits()
            | Self::CALC_TANGENT_SPACE.bits()
            | Self::JOIN_IDENTICAL_VERTICES.bits()
            | Self::SORT_BY_PTYPE.bits()
            | Self::GEN_UV_COORDS.bits()
            | Self::TRANSFORM_UV_COORDS.bits()
            | Self::FLIP_UVS.bits();
    }
}

impl Default for PostProcess {
    fn default() -> Self {
        PostProcess::MODEL_DEFAULT
    }
}

// ===== IMPORTED DATA =====

/// Geometry of one mesh as read from a scene file
///
/// Optional channels are empty when absent; otherwise they hold one entry
/// per position.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ImportedMesh {
    pub name: String,
    pub positions: Vec<[f32; 3]>,
    pub normals: Vec<[f32; 3]>,
    pub tangents: Vec<[f32; 3]>,
    pub bitangents: Vec<[f32; 3]>,
    pub uvs: Vec<[f32; 2]>,
    pub faces: Vec<[u32; 3]>,
}

impl ImportedMesh {
    pub fn vertex_count(&self) -> usize {
        self.positions.len()
    }

    pub fn has_normals(&self) -> bool {
        !self.normals.is_empty()
    }

    pub fn has_uvs(&self) -> bool {
        !self.uvs.is_empty()
    }

    pub fn has_tangents(&self) -> bool {
        !self.tangents.is_empty()
    }

    /// Check channel lengths and face indices
    pub fn validate(&self) -> Result<()> {
        let count = self.positions.len();
        let channels = [
            ("normals", self.normals.len()),
            ("tangents", self.tangents.len()),
            ("bitangents", self.bitangents.len()),
            ("uvs", self.uvs.len()),
        ];
        for (channel, len) in channels {
            if len != 0 && len != count {
                return Err(Error::MalformedResource(format!(
                    "Mesh '{}' has {} {} for {} positions", self.name, len, channel, count
                )));
            }
        }
        if let Some(index) = self.faces.iter().flatten().find(|&&i| i as usize >= count) {
            return Err(Error::MalformedResource(format!(
                "Mesh '{}' references vertex {} but has {} vertices", self.name, index, count
            )));
        }
        Ok(())
    }
}

/// Every mesh read from one scene file, in file order
#[derive(Debug, Clone, Default)]
pub struct ImportedScene {
    pub meshes: Vec<ImportedMesh>,
}

// ===== TRAIT =====

/// Scene-import backend
pub trait SceneImporter: Send + Sync {
    /// Read every mesh of a scene file and post-process it with `flags`
    fn read_scene(&self, file: &ResourceFile, flags: PostProcess) -> Result<ImportedScene>;

    /// Read only the first mesh of a scene file
    ///
    /// Returns the mesh (if any) and the number of meshes the file holds.
    /// Backends that can stop early override this so later meshes are
    /// neither processed nor validated.
    fn read_first_mesh(&self, file: &ResourceFile, flags: PostProcess) -> Result<(Option<ImportedMesh>, usize)> {
        let scene = self.read_scene(file, flags)?;
        let count = scene.meshes.len();
        Ok((scene.meshes.into_iter().next(), count))
    }
}

// ===== GLTF IMPORTER =====

/// glTF 2.0 scene importer
///
/// Produces one `ImportedMesh` per triangle primitive. Buffers are taken
/// from the GLB binary chunk, data URIs, or files next to the scene file.
#[derive(Debug, Default, Clone, Copy)]
pub struct GltfSceneImporter;

impl SceneImporter for GltfSceneImporter {
    fn read_scene(&self, file: &ResourceFile, flags: PostProcess) -> Result<ImportedScene> {
        let (meshes, _) = self.read_meshes(file, flags, usize::MAX)?;
        Ok(ImportedScene { meshes })
    }

    fn read_first_mesh(&self, file: &ResourceFile, flags: PostProcess) -> Result<(Option<ImportedMesh>, usize)> {
        let (meshes, count) = self.read_meshes(file, flags, 1)?;
        Ok((meshes.into_iter().next(), count))
    }
}

impl GltfSceneImporter {
    pub fn new() -> Self {
        Self
    }

    /// Read up to `limit` meshes; also returns the glTF primitive count
    fn read_meshes(&self, file: &ResourceFile, flags: PostProcess, limit: usize) -> Result<(Vec<ImportedMesh>, usize)> {
        let malformed = |e: gltf::Error| {
            Error::MalformedResource(format!("Scene '{}': {}", file.path.display(), e))
        };

        let gltf::Gltf { document, blob } = gltf::Gltf::from_slice(&file.bytes).map_err(malformed)?;
        let buffers = gltf::import_buffers(&document, Some(file.directory()), blob).map_err(malformed)?;

        let count = document.meshes().map(|mesh| mesh.primitives().len()).sum();
        let mut meshes = Vec::new();
        'meshes: for mesh in document.meshes() {
            let mesh_name = mesh.name()
                .map(str::to_string)
                .unwrap_or_else(|| format!("mesh_{}", mesh.index()));

            for primitive in mesh.primitives() {
                let Some(faces_of) = face_builder(primitive.mode(), flags) else {
                    crate::engine_debug!("ember3d::SceneImporter",
                        "Dropping {:?} primitive of mesh '{}'", primitive.mode(), mesh_name);
                    continue;
                };
                let faces_of = faces_of.map_err(|mode| Error::MalformedResource(format!(
                    "Mesh '{}' has a {:?} primitive", mesh_name, mode
                )))?;

                let reader = primitive.reader(|buffer| {
                    buffers.get(buffer.index()).map(|data| data.0.as_slice())
                });

                let positions: Vec<[f32; 3]> = reader.read_positions()
                    .ok_or_else(|| Error::MalformedResource(format!(
                        "Mesh '{}' has a primitive without positions", mesh_name
                    )))?
                    .collect();
                let normals: Vec<[f32; 3]> = reader.read_normals()
                    .map(|n| n.collect())
                    .unwrap_or_default();
                let uvs: Vec<[f32; 2]> = reader.read_tex_coords(0)
                    .map(|t| t.into_f32().collect())
                    .unwrap_or_default();
                let indices: Vec<u32> = reader.read_indices()
                    .map(|i| i.into_u32().collect())
                    .unwrap_or_else(|| (0..positions.len() as u32).collect());

                let (tangents, bitangents) = match reader.read_tangents() {
                    Some(encoded) if normals.len() == positions.len() => {
                        split_tangents(&normals, encoded.collect())
                    }
                    _ => (Vec::new(), Vec::new()),
                };

                let mut imported = ImportedMesh {
                    name: mesh_name.clone(),
                    positions,
                    normals,
                    tangents,
                    bitangents,
                    uvs,
                    faces: faces_of(&indices),
                };
                post_process(&mut imported, flags)?;
                meshes.push(imported);
                if meshes.len() >= limit {
                    break 'meshes;
                }
            }
        }

        Ok((meshes, count))
    }
}

type FaceBuilder = fn(&[u32]) -> Vec<[u32; 3]>;

/// How to turn an index list of `mode` into faces
///
/// `None` means the primitive is dropped, `Some(Err)` that it cannot be imported.
fn face_builder(
    mode: gltf::mesh::Mode,
    flags: PostProcess,
) -> Option<std::result::Result<FaceBuilder, gltf::mesh::Mode>> {
    use gltf::mesh::Mode;

    match mode {
        Mode::Triangles => Some(Ok(triangle_list as FaceBuilder)),
        Mode::TriangleStrip if flags.contains(PostProcess::TRIANGULATE) => Some(Ok(triangle_strip as FaceBuilder)),
        Mode::TriangleFan if flags.contains(PostProcess::TRIANGULATE) => Some(Ok(triangle_fan as FaceBuilder)),
        Mode::TriangleStrip | Mode::TriangleFan => Some(Err(mode)),
        _ if flags.contains(PostProcess::SORT_BY_PTYPE) => None,
        _ => Some(Err(mode)),
    }
}

fn triangle_list(indices: &[u32]) -> Vec<[u32; 3]> {
    indices.chunks_exact(3).map(|t| [t[0], t[1], t[2]]).collect()
}

fn triangle_strip(indices: &[u32]) -> Vec<[u32; 3]> {
    indices.windows(3)
        .enumerate()
        .map(|(i, w)| if i % 2 == 0 { [w[0], w[1], w[2]] } else { [w[0], w[2], w[1]] })
        .collect()
}

fn triangle_fan(indices: &[u32]) -> Vec<[u32; 3]> {
    match indices.split_first() {
        Some((&center, rest)) => rest.windows(2).map(|w| [w[0], w[1], center]).collect(),
        None => Vec::new(),
    }
}

/// Split glTF/MikkTSpace encoded tangents (xyz + handedness) into tangent and bitangent
fn split_tangents(normals: &[[f32; 3]], encoded: Vec<[f32; 4]>) -> (Vec<[f32; 3]>, Vec<[f32; 3]>) {
    encoded.iter()
        .zip(normals)
        .map(|(t, n)| {
            let tangent = Vec3::new(t[0], t[1], t[2]);
            let bitangent = Vec3::from(*n).cross(tangent) * t[3];
            (tangent.to_array(), bitangent.to_array())
        })
        .unzip()
}

// ===== POST PROCESSING =====

/// Apply post-processing steps to a mesh, in this order: generate normals,
/// generate UVs, flip V, join identical vertices, compute tangent space
///
/// # Errors
///
/// `Error::MalformedResource` if the mesh fails validation.
pub fn post_process(mesh: &mut ImportedMesh, flags: PostProcess) -> Result<()> {
    mesh.validate()?;

    if flags.contains(PostProcess::GEN_NORMALS) && !mesh.has_normals() {
        mesh.normals = smooth_normals(&mesh.positions, &mesh.faces);
    }

    if flags.contains(PostProcess::GEN_UV_COORDS) && !mesh.has_uvs() {
        mesh.uvs = planar_uvs(&mesh.positions);
    }

    if flags.contains(PostProcess::FLIP_UVS) {
        for uv in &mut mesh.uvs {
            uv[1] = 1.0 - uv[1];
        }
    }

    if flags.contains(PostProcess::JOIN_IDENTICAL_VERTICES) {
        join_identical_vertices(mesh);
    }

    if flags.contains(PostProcess::CALC_TANGENT_SPACE)
        && !mesh.has_tangents()
        && mesh.has_normals()
        && mesh.has_uvs()
        && !mesh.faces.is_empty()
    {
        match tangent_space(mesh) {
            Some((tangents, bitangents)) => {
                mesh.tangents = tangents;
                mesh.bitangents = bitangents;
            }
            None => {
                crate::engine_warn!("ember3d::SceneImporter",
                    "Tangent space generation failed for mesh '{}'", mesh.name);
            }
        }
    }

    Ok(())
}

/// Area-weighted vertex normals
fn smooth_normals(positions: &[[f32; 3]], faces: &[[u32; 3]]) -> Vec<[f32; 3]> {
    let mut accumulated = vec![Vec3::ZERO; positions.len()];
    for face in faces {
        let [p0, p1, p2] = face.map(|i| Vec3::from(positions[i as usize]));
        let weighted = (p1 - p0).cross(p2 - p0);
        for &i in face {
            accumulated[i as usize] += weighted;
        }
    }
    accumulated.into_iter()
        .map(|n| if n.length_squared() < f32::EPSILON { Vec3::Y } else { n.normalize() })
        .map(|n| n.to_array())
        .collect()
}

/// Planar projection onto the two axes with the largest extent
fn planar_uvs(positions: &[[f32; 3]]) -> Vec<[f32; 2]> {
    let (min, max) = positions.iter().fold(
        (Vec3::splat(f32::MAX), Vec3::splat(f32::MIN)),
        |(min, max), p| (min.min(Vec3::from(*p)), max.max(Vec3::from(*p))),
    );
    let extent = (max - min).max(Vec3::ZERO);

    // Drop the axis with the smallest extent
    let mut axes = [0usize, 1, 2];
    axes.sort_by(|&a, &b| extent[b].total_cmp(&extent[a]));
    let (u_axis, v_axis) = (axes[0].min(axes[1]), axes[0].max(axes[1]));

    let normalize = |value: f32, axis: usize| {
        if extent[axis] > 0.0 { (value - min[axis]) / extent[axis] } else { 0.0 }
    };

    positions.iter()
        .map(|p| [normalize(p[u_axis], u_axis), normalize(p[v_axis], v_axis)])
        .collect()
}

fn join_identical_vertices(mesh: &mut ImportedMesh) {
    let count = mesh.positions.len();
    let mut unique: FxHashMap<Vec<u32>, u32> = FxHashMap::default();
    let mut remap = Vec::with_capacity(count);
    let mut kept = Vec::new();

    for i in 0..count {
        let mut key: Vec<u32> = mesh.positions[i].iter().map(|c| c.to_bits()).collect();
        for channel in [&mesh.normals, &mesh.tangents, &mesh.bitangents] {
            if let Some(value) = channel.get(i) {
                key.extend(value.iter().map(|c| c.to_bits()));
            }
        }
        if let Some(uv) = mesh.uvs.get(i) {
            key.extend(uv.iter().map(|c| c.to_bits()));
        }

        let next = kept.len() as u32;
        let target = *unique.entry(key).or_insert_with(|| {
            kept.push(i);
            next
        });
        remap.push(target);
    }

    if kept.len() == count {
        return;
    }

    fn select<T: Copy>(channel: &[T], kept: &[usize]) -> Vec<T> {
        if channel.is_empty() {
            Vec::new()
        } else {
            kept.iter().map(|&i| channel[i]).collect()
        }
    }

    mesh.positions = select(&mesh.positions, &kept);
    mesh.normals = select(&mesh.normals, &kept);
    mesh.tangents = select(&mesh.tangents, &kept);
    mesh.bitangents = select(&mesh.bitangents, &kept);
    mesh.uvs = select(&mesh.uvs, &kept);
    for face in &mut mesh.faces {
        *face = face.map(|i| remap[i as usize]);
    }
}

/// MikkTSpace tangents and bitangents (`cross(normal, tangent) * handedness`)
fn tangent_space(mesh: &ImportedMesh) -> Option<(Vec<[f32; 3]>, Vec<[f32; 3]>)> {
    struct MeshGeometry<'a> {
        mesh: &'a ImportedMesh,
        tangents: Vec<[f32; 4]>,
    }

    impl<'a> Geometry for MeshGeometry<'a> {
        fn num_faces(&self) -> usize {
            self.mesh.faces.len()
        }

        fn num_vertices_of_face(&self, _face: usize) -> usize {
            3
        }

        fn position(&self, face: usize, vert: usize) -> [f32; 3] {
            self.mesh.positions[self.mesh.faces[face][vert] as usize]
        }

        fn normal(&self, face: usize, vert: usize) -> [f32; 3] {
            self.mesh.normals[self.mesh.faces[face][vert] as usize]
        }

        fn tex_coord(&self, face: usize, vert: usize) -> [f32; 2] {
            self.mesh.uvs[self.mesh.faces[face][vert] as usize]
        }

        fn set_tangent_encoded(&mut self, tangent: [f32; 4], face: usize, vert: usize) {
            let idx = self.mesh.faces[face][vert] as usize;
            self.tangents[idx] = tangent;
        }
    }

    let mut geometry = MeshGeometry {
        mesh,
        tangents: vec![[0.0; 4]; mesh.positions.len()],
    };
    if !generate_tangents(&mut geometry) {
        return None;
    }

    Some(split_tangents(&mesh.normals, geometry.tangents))
}

#[cfg(test)]
#[path = "scene_import_tests.rs"]
mod tests;
