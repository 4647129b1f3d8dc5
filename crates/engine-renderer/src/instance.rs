use bytemuck::{Pod, Zeroable};
use glam::Mat4;
use wgpu::{BufferAddress, VertexAttribute, VertexBufferLayout, VertexFormat, VertexStepMode};

/// インスタンスごとのテクスチャ・サンプラーの組
/// 値はバインドレス配列のインデックス
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct TextureBinding {
    pub texture: u32,
    pub sampler: u32,
}

impl TextureBinding {
    pub fn new(texture: u32, sampler: u32) -> Self {
        Self { texture, sampler }
    }
}

/// インスタンスバッファ1要素分のデータ
/// 集約インスタンスバッファにそのままの並びで書き込まれる
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct PerInstanceRecord {
    /// モデル行列（列優先）
    pub model: [[f32; 4]; 4],
    pub texture: u32,
    pub sampler: u32,
    _pad: [u32; 2],
}

impl PerInstanceRecord {
    /// バイトサイズ（16バイト境界に揃えてある）
    pub const SIZE: u64 = std::mem::size_of::<PerInstanceRecord>() as u64;

    pub fn new(model: Mat4, textures: TextureBinding) -> Self {
        Self {
            model: model.to_cols_array_2d(),
            texture: textures.texture,
            sampler: textures.sampler,
            _pad: [0; 2],
        }
    }

    /// 単位行列のレコード
    pub fn identity(textures: TextureBinding) -> Self {
        Self::new(Mat4::IDENTITY, textures)
    }

    pub fn model_matrix(&self) -> Mat4 {
        Mat4::from_cols_array_2d(&self.model)
    }

    pub fn set_model_matrix(&mut self, model: Mat4) {
        self.model = model.to_cols_array_2d();
    }

    pub fn textures(&self) -> TextureBinding {
        TextureBinding::new(self.texture, self.sampler)
    }

    /// インスタンスバッファを頂点バッファ（スロット1、インスタンスごと）として使う場合のレイアウト
    pub fn desc() -> VertexBufferLayout<'static> {
        const COLUMN: BufferAddress = std::mem::size_of::<[f32; 4]>() as BufferAddress;

        VertexBufferLayout {
            array_stride: std::mem::size_of::<PerInstanceRecord>() as BufferAddress,
            step_mode: VertexStepMode::Instance,
            attributes: &[
                // model matrix columns
                VertexAttribute {
                    offset: 0,
                    shader_location: 4,
                    format: VertexFormat::Float32x4,
                },
                VertexAttribute {
                    offset: COLUMN,
                    shader_location: 5,
                    format: VertexFormat::Float32x4,
                },
                VertexAttribute {
                    offset: COLUMN * 2,
                    shader_location: 6,
                    format: VertexFormat::Float32x4,
                },
                VertexAttribute {
                    offset: COLUMN * 3,
                    shader_location: 7,
                    format: VertexFormat::Float32x4,
                },
                // texture, sampler
                VertexAttribute {
                    offset: COLUMN * 4,
                    shader_location: 8,
                    format: VertexFormat::Uint32x2,
                },
            ],
        }
    }
}

impl Default for PerInstanceRecord {
    fn default() -> Self {
        Self::identity(TextureBinding::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec3;

    #[test]
    fn test_record_size_is_16_byte_aligned() {
        assert_eq!(PerInstanceRecord::SIZE, 80);
        assert_eq!(PerInstanceRecord::SIZE % 16, 0);
        assert_eq!(PerInstanceRecord::desc().array_stride, 80);
    }

    #[test]
    fn test_model_matrix_roundtrip() {
        let m = Mat4::from_translation(Vec3::new(1.0, 2.0, 3.0));
        let mut record = PerInstanceRecord::identity(TextureBinding::new(4, 2));
        assert_eq!(record.model_matrix(), Mat4::IDENTITY);

        record.set_model_matrix(m);
        assert_eq!(record.model_matrix(), m);
        assert_eq!(record.textures(), TextureBinding::new(4, 2));
    }

    #[test]
    fn test_bytes_layout() {
        let record = PerInstanceRecord::new(Mat4::IDENTITY, TextureBinding::new(9, 3));
        let bytes = bytemuck::bytes_of(&record);
        assert_eq!(bytes.len(), 80);
        // テクスチャIDはモデル行列の直後
        assert_eq!(&bytes[64..68], &9u32.to_ne_bytes());
        assert_eq!(&bytes[68..72], &3u32.to_ne_bytes());
    }
}
