/*
Copyright 2025 Google LLC

Licensed under the Apache License, Version 2.0 (the "License");
you may not use this file except in compliance with the License.
You may obtain a copy of the License at

     https://www.apache.org/licenses/LICENSE-2.0

Unless required by applicable law or agreed to in writing, software
distributed under the License is distributed on an "AS IS" BASIS,
WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
See the License for the specific language governing permissions and
limitations under the License.
*/

use std::ffi::CString;

/// Shell-style glob match via libc, `FNM_PATHNAME` semantics: `*` does not
/// cross `/` boundaries, matching how ignore patterns are written.
pub fn fnmatch_pathname(pattern: &str, string: &str) -> bool {
    let Ok(pattern) = CString::new(pattern) else {
        return false;
    };
    let Ok(string) = CString::new(string) else {
        return false;
    };
    // SAFETY: This is a relatively simple C func, both CStrings are inputs
    // and only need to last through the function call.
    unsafe { libc::fnmatch(pattern.as_ptr(), string.as_ptr(), libc::FNM_PATHNAME) == 0 }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fnmatch() {
        assert!(fnmatch_pathname("drivers/staging/*", "drivers/staging/foo.c"));
        assert!(!fnmatch_pathname(
            "drivers/staging/*",
            "drivers/staging/sub/foo.c"
        ));
        assert!(fnmatch_pathname("*.c", "foo.c"));
        assert!(!fnmatch_pathname("*.c", "dir/foo.c"));
    }
}
