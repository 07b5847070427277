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

pub mod mock_time_getter;
pub mod random;

use random::Rng;

/// Random bytes of a length picked from the given range
pub fn random_bytes(rng: &mut impl Rng, len: std::ops::Range<usize>) -> Vec<u8> {
    let len = rng.gen_range(len);
    (0..len).map(|_| rng.gen()).collect()
}

/// Random lowercase alphanumeric string of a length picked from the given range
pub fn random_ascii_alphanumeric_string(rng: &mut impl Rng, len: std::ops::Range<usize>) -> String {
    use rand::distributions::{Alphanumeric, DistString};
    let len = rng.gen_range(len);
    Alphanumeric.sample_string(rng, len).to_lowercase()
}
