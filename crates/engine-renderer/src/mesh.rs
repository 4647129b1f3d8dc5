use bytemuck::{Pod, Zeroable};
use wgpu::{BufferAddress, VertexAttribute, VertexBufferLayout, VertexFormat, VertexStepMode};

/// 頂点構造体
/// 位置、法線、色、UVを含む
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct Vertex {
    pub position: [f32; 3],
    pub normal: [f32; 3],
    pub color: [f32; 3],
    pub uv: [f32; 2],
}

impl Vertex {
    /// 新しい頂点を作成
    pub fn new(position: [f32; 3], normal: [f32; 3], color: [f32; 3], uv: [f32; 2]) -> Self {
        Self { position, normal, color, uv }
    }

    /// 頂点バッファレイアウトを取得（スロット0、頂点ごと）
    pub fn desc() -> VertexBufferLayout<'static> {
        VertexBufferLayout {
            array_stride: std::mem::size_of::<Vertex>() as BufferAddress,
            step_mode: VertexStepMode::Vertex,
            attributes: &[
                // position
                VertexAttribute {
                    offset: 0,
                    shader_location: 0,
                    format: VertexFormat::Float32x3,
                },
                // normal
                VertexAttribute {
                    offset: std::mem::size_of::<[f32; 3]>() as BufferAddress,
                    shader_location: 1,
                    format: VertexFormat::Float32x3,
                },
                // color
                VertexAttribute {
                    offset: std::mem::size_of::<[f32; 6]>() as BufferAddress,
                    shader_location: 2,
                    format: VertexFormat::Float32x3,
                },
                // uv
                VertexAttribute {
                    offset: std::mem::size_of::<[f32; 9]>() as BufferAddress,
                    shader_location: 3,
                    format: VertexFormat::Float32x2,
                },
            ],
        }
    }
}

/// メッシュ構造体（ジオメトリの供給元）
/// 頂点とインデックスをそのまま`MeshResource`に渡す
#[derive(Debug, Clone, Default)]
pub struct Mesh {
    pub vertices: Vec<Vertex>,
    pub indices: Vec<u32>,
}

impl Mesh {
    /// 空のメッシュを作成
    pub fn new() -> Self {
        Self::default()
    }

    /// 頂点とインデックスから作成
    pub fn from_parts(vertices: Vec<Vertex>, indices: Vec<u32>) -> Self {
        Self { vertices, indices }
    }

    /// キューブメッシュを生成（1x1x1、原点中心、面ごとに頂点を分ける）
    pub fn cube() -> Self {
        // 各面に異なる色を設定（視認性のため）
        let colors = [
            [1.0, 0.0, 0.0], // +X red
            [0.0, 1.0, 1.0], // -X cyan
            [0.0, 1.0, 0.0], // +Y green
            [1.0, 0.0, 1.0], // -Y magenta
            [0.0, 0.0, 1.0], // +Z blue
            [1.0, 1.0, 0.0], // -Z yellow
        ];
        let uvs = [[0.0, 1.0], [0.0, 0.0], [1.0, 0.0], [1.0, 1.0]];

        // (法線, 4隅の位置)
        let faces: [([f32; 3], [[f32; 3]; 4]); 6] = [
            // +X face (right)
            ([1.0, 0.0, 0.0], [[0.5, -0.5, -0.5], [0.5, 0.5, -0.5], [0.5, 0.5, 0.5], [0.5, -0.5, 0.5]]),
            // -X face (left)
            ([-1.0, 0.0, 0.0], [[-0.5, -0.5, 0.5], [-0.5, 0.5, 0.5], [-0.5, 0.5, -0.5], [-0.5, -0.5, -0.5]]),
            // +Y face (top)
            ([0.0, 1.0, 0.0], [[-0.5, 0.5, -0.5], [-0.5, 0.5, 0.5], [0.5, 0.5, 0.5], [0.5, 0.5, -0.5]]),
            // -Y face (bottom)
            ([0.0, -1.0, 0.0], [[-0.5, -0.5, 0.5], [-0.5, -0.5, -0.5], [0.5, -0.5, -0.5], [0.5, -0.5, 0.5]]),
            // +Z face (front)
            ([0.0, 0.0, 1.0], [[-0.5, -0.5, 0.5], [0.5, -0.5, 0.5], [0.5, 0.5, 0.5], [-0.5, 0.5, 0.5]]),
            // -Z face (back)
            ([0.0, 0.0, -1.0], [[0.5, -0.5, -0.5], [-0.5, -0.5, -0.5], [-0.5, 0.5, -0.5], [0.5, 0.5, -0.5]]),
        ];

        let mut vertices = Vec::with_capacity(24);
        let mut indices = Vec::with_capacity(36);

        for (face, (normal, corners)) in faces.iter().enumerate() {
            let base = vertices.len() as u32;
            for (corner, uv) in corners.iter().zip(uvs) {
                vertices.push(Vertex::new(*corner, *normal, colors[face], uv));
            }
            indices.extend_from_slice(&[base, base + 1, base + 2, base, base + 2, base + 3]);
        }

        Self { vertices, indices }
    }

    /// 頂点を共有するキューブ（8頂点、36インデックス）
    /// 法線は中心からの方向
    pub fn cube_shared() -> Self {
        let mut vertices = Vec::with_capacity(8);
        for i in 0..8u32 {
            let x: f32 = if i & 1 == 0 { -0.5 } else { 0.5 };
            let y: f32 = if i & 2 == 0 { -0.5 } else { 0.5 };
            let z: f32 = if i & 4 == 0 { -0.5 } else { 0.5 };
            let len = (x * x + y * y + z * z).sqrt();
            vertices.push(Vertex::new(
                [x, y, z],
                [x / len, y / len, z / len],
                [x + 0.5, y + 0.5, z + 0.5],
                [x + 0.5, y + 0.5],
            ));
        }

        #[rustfmt::skip]
        let indices = vec![
            1, 3, 7, 1, 7, 5, // +X
            0, 4, 6, 0, 6, 2, // -X
            2, 6, 7, 2, 7, 3, // +Y
            0, 1, 5, 0, 5, 4, // -Y
            4, 5, 7, 4, 7, 6, // +Z
            0, 2, 3, 0, 3, 1, // -Z
        ];

        Self { vertices, indices }
    }

    /// 頂点数を取得
    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    /// インデックス数を取得
    pub fn index_count(&self) -> usize {
        self.indices.len()
    }
}
