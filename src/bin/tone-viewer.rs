use flow_tones::{context::ViewerConfig, flow, gpu::GpuRenderer, resources::GltfImporter};

fn main() -> anyhow::Result<()> {
    flow::run(ViewerConfig::default(), GltfImporter::new(), GpuRenderer::constructor())
}
