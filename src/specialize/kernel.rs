//! Kernel definition wrappers.
//!
//! GPU kernels keep their body as-is under a `#[kernel]` attribute; the
//! launch supplies the parallelism. CPU kernels take the index space as
//! an extra leading parameter, record the range bookkeeping once, and
//! run the body once per outer index inside the dispatch construct.
//!
//! The CPU body becomes an `Fn + Sync` closure, so kernel parameters
//! written by the body must be shared outputs (atomics or `Mutex`
//! slices), and `Dim3` components index slices through `to_usize`.

use crate::emit::ParallelConstruct;
use crate::index_space::Axis;

/// Imports needed by CPU-specialized kernels.
pub(super) const CPU_PRELUDE: &str = "use parakern::prelude::*;\n\n";

const RANGES: &str = "__ranges";

pub(super) fn render(construct: ParallelConstruct, name: &str, params: &str, body: &str) -> String {
    match construct.method() {
        None => format!("#[kernel]\nfn {}({}) {{{}}}", name, params, body),
        Some(method) => {
            let params = if params.is_empty() {
                format!("{}: &IndexSpace", RANGES)
            } else {
                format!("{}: &IndexSpace, {}", RANGES, params)
            };
            let [fx, fy, fz] = Axis::ALL.map(Axis::first_var);
            let [lx, ly, lz] = Axis::ALL.map(Axis::len_var);
            let [ix, iy, iz] = Axis::ALL.map(Axis::index_var);
            let mut out = format!("fn {}({}) {{\n", name, params);
            out.push_str(&format!(
                "    let [{}, {}, {}] = {}.firsts();\n",
                fx, fy, fz, RANGES
            ));
            out.push_str(&format!(
                "    let Dim3 {{ x: {}, y: {}, z: {} }} = {}.lengths();\n",
                lx, ly, lz, RANGES
            ));
            out.push_str(&format!(
                "    {}.{}(|CurrentIndex {{ x: {}, y: {}, z: {} }}| {{{}\n    }});\n}}",
                RANGES,
                method,
                ix,
                iy,
                iz,
                indent_body(body)
            ));
            out
        }
    }
}

/// Shift every body line one level right, dropping trailing blank space.
fn indent_body(body: &str) -> String {
    let mut out = String::with_capacity(body.len() + 16);
    for (i, line) in body.trim_end().split('\n').enumerate() {
        if i > 0 {
            out.push('\n');
            if !line.trim().is_empty() {
                out.push_str("    ");
            }
        }
        out.push_str(line);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gpu_wrapper_keeps_body_verbatim() {
        let text = render(ParallelConstruct::Empty, "copy", "a, b", " b = a; ");
        assert_eq!(text, "#[kernel]\nfn copy(a, b) { b = a; }");
    }

    #[test]
    fn test_cpu_wrapper_records_bookkeeping() {
        let text = render(
            ParallelConstruct::Threaded,
            "fill",
            "out",
            "\n    out = 1;\n",
        );
        assert_eq!(
            text,
            "fn fill(__ranges: &IndexSpace, out) {\n\
             \x20   let [__first_x, __first_y, __first_z] = __ranges.firsts();\n\
             \x20   let Dim3 { x: __len_x, y: __len_y, z: __len_z } = __ranges.lengths();\n\
             \x20   __ranges.par_for_each(|CurrentIndex { x: __ix, y: __iy, z: __iz }| {\n\
             \x20       out = 1;\n\
             \x20   });\n\
             }"
        );
    }

    #[test]
    fn test_cpu_wrapper_without_params() {
        let text = render(ParallelConstruct::Batched, "noop", "", "");
        assert!(text.starts_with("fn noop(__ranges: &IndexSpace) {"));
        assert!(text.contains("__ranges.batched_for_each("));
    }
}
