/// Asset fixtures shared by the resource unit tests
///
/// Scene files are assembled as binary glTF in memory, textures are encoded
/// with the `image` crate.

use std::io::Cursor;

/// glTF primitive modes
pub const MODE_POINTS: u32 = 0;
pub const MODE_TRIANGLES: u32 = 4;
pub const MODE_TRIANGLE_STRIP: u32 = 5;

/// One primitive of a test scene
pub struct TestMesh {
    pub name: &'static str,
    pub positions: Vec<[f32; 3]>,
    pub uvs: Option<Vec<[f32; 2]>>,
    pub indices: Option<Vec<u16>>,
    pub mode: u32,
}

impl TestMesh {
    /// Indexed triangle list without UVs
    pub fn triangles(name: &'static str, positions: Vec<[f32; 3]>, indices: Vec<u16>) -> Self {
        Self {
            name,
            positions,
            uvs: None,
            indices: Some(indices),
            mode: MODE_TRIANGLES,
        }
    }

    pub fn with_uvs(mut self, uvs: Vec<[f32; 2]>) -> Self {
        self.uvs = Some(uvs);
        self
    }
}

/// Right triangle in the XY plane
pub fn triangle_mesh() -> TestMesh {
    TestMesh::triangles(
        "triangle",
        vec![[0.0, 0.0, 0.0], [2.0, 0.0, 0.0], [0.0, 1.0, -1.0]],
        vec![0, 1, 2],
    )
}

/// Unit quad in the XY plane, two triangles, with UVs
pub fn quad_mesh() -> TestMesh {
    TestMesh::triangles(
        "quad",
        vec![[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [1.0, 1.0, 0.0], [0.0, 1.0, 0.0]],
        vec![0, 1, 2, 0, 2, 3],
    )
    .with_uvs(vec![[0.0, 0.0], [1.0, 0.0], [1.0, 1.0], [0.0, 1.0]])
}

fn pad_to_four(bytes: &mut Vec<u8>, fill: u8) {
    while bytes.len() % 4 != 0 {
        bytes.push(fill);
    }
}

fn float_list(values: &[f32]) -> String {
    values.iter().map(|v| format!("{:?}", v)).collect::<Vec<_>>().join(",")
}

/// Assemble a binary glTF file holding one mesh per `TestMesh`
pub fn glb(meshes: &[TestMesh]) -> Vec<u8> {
    let mut bin: Vec<u8> = Vec::new();
    let mut views = Vec::new();
    let mut accessors = Vec::new();
    let mut json_meshes = Vec::new();

    let mut push_view = |bin: &mut Vec<u8>, bytes: &[u8]| -> usize {
        let offset = bin.len();
        bin.extend_from_slice(bytes);
        pad_to_four(bin, 0);
        views.push(format!(
            r#"{{"buffer":0,"byteOffset":{},"byteLength":{}}}"#, offset, bytes.len()
        ));
        views.len() - 1
    };

    for mesh in meshes {
        let mut attributes = Vec::new();

        let position_bytes: Vec<u8> = mesh.positions.iter().flatten().flat_map(|c| c.to_le_bytes()).collect();
        let view = push_view(&mut bin, &position_bytes);
        let mut min = [f32::MAX; 3];
        let mut max = [f32::MIN; 3];
        for p in &mesh.positions {
            for axis in 0..3 {
                min[axis] = min[axis].min(p[axis]);
                max[axis] = max[axis].max(p[axis]);
            }
        }
        accessors.push(format!(
            r#"{{"bufferView":{},"componentType":5126,"count":{},"type":"VEC3","min":[{}],"max":[{}]}}"#,
            view, mesh.positions.len(), float_list(&min), float_list(&max)
        ));
        attributes.push(format!(r#""POSITION":{}"#, accessors.len() - 1));

        if let Some(uvs) = &mesh.uvs {
            let uv_bytes: Vec<u8> = uvs.iter().flatten().flat_map(|c| c.to_le_bytes()).collect();
            let view = push_view(&mut bin, &uv_bytes);
            accessors.push(format!(
                r#"{{"bufferView":{},"componentType":5126,"count":{},"type":"VEC2"}}"#,
                view, uvs.len()
            ));
            attributes.push(format!(r#""TEXCOORD_0":{}"#, accessors.len() - 1));
        }

        let indices = match &mesh.indices {
            Some(indices) => {
                let index_bytes: Vec<u8> = indices.iter().flat_map(|i| i.to_le_bytes()).collect();
                let view = push_view(&mut bin, &index_bytes);
                accessors.push(format!(
                    r#"{{"bufferView":{},"componentType":5123,"count":{},"type":"SCALAR"}}"#,
                    view, indices.len()
                ));
                format!(r#","indices":{}"#, accessors.len() - 1)
            }
            None => String::new(),
        };

        json_meshes.push(format!(
            r#"{{"name":"{}","primitives":[{{"attributes":{{{}}}{},"mode":{}}}]}}"#,
            mesh.name, attributes.join(","), indices, mesh.mode
        ));
    }

    let mut json = format!(
        r#"{{"asset":{{"version":"2.0"}},"buffers":[{{"byteLength":{}}}],"bufferViews":[{}],"accessors":[{}],"meshes":[{}]}}"#,
        bin.len(), views.join(","), accessors.join(","), json_meshes.join(",")
    ).into_bytes();
    pad_to_four(&mut json, b' ');

    let total = 12 + 8 + json.len() + 8 + bin.len();
    let mut out = Vec::with_capacity(total);
    out.extend_from_slice(&0x4654_6C67u32.to_le_bytes());
    out.extend_from_slice(&2u32.to_le_bytes());
    out.extend_from_slice(&(total as u32).to_le_bytes());
    out.extend_from_slice(&(json.len() as u32).to_le_bytes());
    out.extend_from_slice(&0x4E4F_534Au32.to_le_bytes());
    out.extend_from_slice(&json);
    out.extend_from_slice(&(bin.len() as u32).to_le_bytes());
    out.extend_from_slice(&0x004E_4942u32.to_le_bytes());
    out.extend_from_slice(&bin);
    out
}

/// Encode a solid-colour RGBA PNG
pub fn png(width: u32, height: u32) -> Vec<u8> {
    let image = image::RgbaImage::from_pixel(width, height, image::Rgba([200, 100, 50, 255]));
    let mut bytes = Vec::new();
    image.write_to(&mut Cursor::new(&mut bytes), image::ImageFormat::Png)
        .expect("PNG encoding");
    bytes
}

/// BMFont XML with the given pages and `chars` block
pub fn bmfont_xml(pages: &[&str], chars: &str) -> String {
    let page_elements: String = pages.iter()
        .enumerate()
        .map(|(id, file)| format!(r#"<page id="{}" file="{}"/>"#, id, file))
        .collect();
    format!(
        r#"<?xml version="1.0"?>
<font>
  <info face="Arial" size="32" bold="0" italic="1" charset="" unicode="1" stretchH="100" smooth="1" aa="1" padding="2,3,4,5" spacing="1,2" outline="0"/>
  <common lineHeight="32" base="26" scaleW="256" scaleH="256" pages="{}" packed="0" alphaChnl="1" redChnl="0" greenChnl="0" blueChnl="0"/>
  <pages>{}</pages>
  {}
</font>"#,
        pages.len(), page_elements, chars
    )
}

/// `chars` block holding 'A', 'B' and 'C'
pub const THREE_CHARS: &str = r#"<chars count="3">
    <char id="65" x="0" y="0" width="10" height="20" xoffset="1" yoffset="2" xadvance="12" page="0" chnl="15"/>
    <char id="66" x="10" y="0" width="9" height="20" xoffset="1" yoffset="2" xadvance="11" page="0" chnl="15"/>
    <char id="67" x="19" y="0" width="8" height="20" xoffset="0" yoffset="2" xadvance="10" page="0" chnl="15"/>
  </chars>"#;

/// Material XML referencing two shaders and one texture
pub fn material_xml(vertex: &str, pixel: &str, diffuse: Option<&str>) -> String {
    let texture = diffuse
        .map(|file| format!(r#"<texture slot="diffuse" file="{}"/>"#, file))
        .unwrap_or_default();
    format!(
        r#"<material>
    <shader stage="vertex" file="{}"/>
    <shader stage="pixel" file="{}"/>
    {}
    <param name="tint" type="vec4" value="1,1,1,1"/>
</material>"#,
        vertex, pixel, texture
    )
}
