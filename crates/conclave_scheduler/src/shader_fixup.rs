/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

//! Shader-source dialect fixup (spec §4.7): a line-oriented rewrite of a
//! `#version` directive to the host's GL profile, applied right before the
//! real `shaderSource` call. Everything but that one line passes through
//! untouched, mirroring the line-by-line approach `get_glsl_version` in the
//! teacher's `canvas::webgl_thread` takes to the same dialect-mismatch
//! problem (there: picking a version string to report back; here: rewriting
//! one in the source the document sent).

/// Rewrites the first `#version` directive in `source` to `target`, leaving
/// every other line exactly as it was, including line endings.
pub fn rewrite_version_directive(source: &str, target: &str) -> String {
    let mut rewritten = false;
    let mut out = String::with_capacity(source.len());
    for line in source.split_inclusive('\n') {
        if !rewritten && line.trim_start().starts_with("#version") {
            let ending = if line.ends_with("\r\n") {
                "\r\n"
            } else if line.ends_with('\n') {
                "\n"
            } else {
                ""
            };
            out.push_str("#version ");
            out.push_str(target);
            out.push_str(ending);
            rewritten = true;
        } else {
            out.push_str(line);
        }
    }
    out
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn rewrites_only_the_version_line() {
        let source = "#version 100\nvoid main() {\n  gl_FragColor = vec4(1.0);\n}\n";
        let rewritten = rewrite_version_directive(source, "330 core");
        assert_eq!(
            rewritten,
            "#version 330 core\nvoid main() {\n  gl_FragColor = vec4(1.0);\n}\n"
        );
    }

    #[test]
    fn leaves_source_with_no_directive_untouched() {
        let source = "void main() {}\n";
        assert_eq!(rewrite_version_directive(source, "330 core"), source);
    }

    #[test]
    fn only_the_first_directive_is_rewritten() {
        let source = "#version 100\n// #version 300 es in a comment\n";
        let rewritten = rewrite_version_directive(source, "330 core");
        assert_eq!(rewritten, "#version 330 core\n// #version 300 es in a comment\n");
    }
}
