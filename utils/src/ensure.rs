// Copyright (c) 2021-2026 RBB S.r.l
// opensource@mintlayer.org
// SPDX-License-Identifier: MIT
// Licensed under the MIT License;
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
// https://github.com/mintlayer/mintlayer-core/blob/master/LICENSE
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Early exit from a function unless a condition holds.

/// Return early if the condition is not satisfied.
///
/// * `ensure!(cond)` returns [`None`] from the enclosing function if `cond` is false
/// * `ensure!(cond, err)` returns [`Err`]`(err)` from the enclosing function if `cond` is false;
///   `err` is only evaluated on failure
///
/// ```
/// # use utils::ensure;
/// #[derive(PartialEq, Eq, Debug)]
/// enum PathError {
///     Empty,
///     TooDeep(usize),
/// }
///
/// fn segments(path: &str, max_depth: usize) -> Result<Vec<&str>, PathError> {
///     let segments: Vec<_> = path.split('/').filter(|s| !s.is_empty()).collect();
///     ensure!(!segments.is_empty(), PathError::Empty);
///     ensure!(segments.len() <= max_depth, PathError::TooDeep(segments.len()));
///     Ok(segments)
/// }
///
/// assert_eq!(segments("/users/alice", 2), Ok(vec!["users", "alice"]));
/// assert_eq!(segments("//", 2), Err(PathError::Empty));
/// assert_eq!(segments("/a/b/c", 2), Err(PathError::TooDeep(3)));
///
/// fn first_segment(path: &str) -> Option<&str> {
///     ensure!(path.starts_with('/'));
///     path[1..].split('/').next()
/// }
///
/// assert_eq!(first_segment("/users/alice"), Some("users"));
/// assert_eq!(first_segment("users"), None);
/// ```
#[macro_export]
macro_rules! ensure {
    ($cond:expr $(,)?) => {
        $cond.then_some(())?
    };
    ($cond:expr, $err:expr $(,)?) => {
        $cond.then_some(()).ok_or_else(|| $err)?
    };
}
