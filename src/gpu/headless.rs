use super::{BackendStats, BufferKey, Frame, GpuBackend, ShaderSet, TextureKey};
use crate::error::{PainterError, Result};
use std::collections::HashMap;
use winit::dpi::PhysicalSize;

/// Bookkeeping-only backend: tracks every buffer and texture the drawers
/// allocate and keeps the last submitted frame for inspection.
#[derive(Debug, Default)]
pub struct HeadlessBackend {
    size: PhysicalSize<u32>,
    compiled: bool,
    buffers: HashMap<BufferKey, Vec<u8>>,
    textures: HashMap<TextureKey, (u32, u32)>,
    stats: BackendStats,
    last_frame: Option<Frame>,
}

impl HeadlessBackend {
    pub fn new(size: PhysicalSize<u32>) -> Self {
        Self {
            size,
            ..Default::default()
        }
    }

    pub fn texture_size(&self, key: TextureKey) -> Option<(u32, u32)> {
        self.textures.get(&key).copied()
    }
}

impl GpuBackend for HeadlessBackend {
    fn compile(&mut self, shaders: &ShaderSet) -> Result<()> {
        shaders.validate()?;
        self.compiled = true;
        Ok(())
    }

    fn create_buffer(&mut self, _label: &str, contents: &[u8]) -> BufferKey {
        let key = BufferKey::new();
        self.buffers.insert(key, contents.to_vec());
        self.stats.buffers_created += 1;
        self.stats.buffers_live = self.buffers.len();
        key
    }

    fn delete_buffer(&mut self, key: BufferKey) {
        self.buffers.remove(&key);
        self.stats.buffers_live = self.buffers.len();
    }

    fn create_texture(&mut self, width: u32, height: u32, rgba: &[u8]) -> Result<TextureKey> {
        if rgba.len() != (width as usize) * (height as usize) * 4 {
            return Err(PainterError::Image(format!(
                "expected {} bytes for a {}x{} texture, got {}",
                width as usize * height as usize * 4,
                width,
                height,
                rgba.len()
            )));
        }
        let key = TextureKey::new();
        self.textures.insert(key, (width, height));
        self.stats.textures_created += 1;
        self.stats.textures_live = self.textures.len();
        Ok(key)
    }

    fn delete_texture(&mut self, key: TextureKey) {
        self.textures.remove(&key);
        self.stats.textures_live = self.textures.len();
    }

    fn resize(&mut self, size: PhysicalSize<u32>) {
        self.size = size;
    }

    fn size(&self) -> PhysicalSize<u32> {
        self.size
    }

    fn submit(&mut self, frame: Frame) -> Result<()> {
        if !self.compiled {
            return Err(PainterError::NotInitialized);
        }
        self.stats.frames += 1;
        self.stats.draw_calls += frame.commands.len();
        self.last_frame = Some(frame);
        Ok(())
    }

    fn stats(&self) -> BackendStats {
        self.stats
    }

    fn has_buffer(&self, key: BufferKey) -> bool {
        self.buffers.contains_key(&key)
    }

    fn last_frame(&self) -> Option<&Frame> {
        self.last_frame.as_ref()
    }

    fn buffer_contents(&self, key: BufferKey) -> Option<&[u8]> {
        self.buffers.get(&key).map(|b| b.as_slice())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tracks_buffer_lifetimes() {
        let mut backend = HeadlessBackend::new(PhysicalSize::new(10, 10));
        let a = backend.create_buffer("a", &[0; 12]);
        let b = backend.create_buffer("b", &[0; 4]);
        assert_eq!(backend.stats().buffers_live, 2);
        backend.delete_buffer(a);
        assert!(!backend.has_buffer(a));
        assert!(backend.has_buffer(b));
        assert_eq!(backend.stats().buffers_live, 1);
        assert_eq!(backend.stats().buffers_created, 2);
    }

    #[test]
    fn rejects_short_texture_data() {
        let mut backend = HeadlessBackend::new(PhysicalSize::new(10, 10));
        assert!(backend.create_texture(2, 2, &[0; 15]).is_err());
        assert!(backend.create_texture(2, 2, &[0; 16]).is_ok());
    }

    #[test]
    fn submit_requires_compiled_programs() {
        let mut backend = HeadlessBackend::new(PhysicalSize::new(10, 10));
        assert_eq!(
            backend.submit(Frame::default()),
            Err(PainterError::NotInitialized)
        );
        backend.compile(&ShaderSet::default()).unwrap();
        assert!(backend.submit(Frame::default()).is_ok());
        assert_eq!(backend.stats().frames, 1);
    }
}
