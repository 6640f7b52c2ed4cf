use parakern::Backend;

pub fn cmd_backends() {
    for backend in Backend::ALL {
        let kind = if backend.is_gpu() { "gpu" } else { "cpu" };
        println!("{:<8} {}  {}", backend.name(), kind, backend.description());
    }
}
