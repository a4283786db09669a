pub mod renderer;

pub use renderer::FragmentRenderer;
