/*
 * Copyright 2026 Schemock Team
 *
 * Licensed under the Apache License, Version 2.0 (the "License");
 * you may not use this file except in compliance with the License.
 * You may obtain a copy of the License at
 *
 *     http://www.apache.org/licenses/LICENSE-2.0
 *
 * Unless required by applicable law or agreed to in writing, software
 * distributed under the License is distributed on an "AS IS" BASIS,
 * WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
 * See the License for the specific language governing permissions and
 * limitations under the License.
 */

/// Why a candidate was chosen.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectionKind {
    /// Its condition evaluated to true.
    Condition,
    /// No condition held and it was the first default candidate.
    Default,
    /// No condition held, no default existed, so the last candidate was used.
    Fallback,
}

#[derive(Debug, Clone, Copy)]
pub struct Selection<'a, T> {
    pub candidate: &'a T,
    pub kind: SelectionKind,
}

/// Anything that carries an optional condition expression.
pub trait Conditional {
    fn condition(&self) -> Option<&str>;
}

impl Conditional for crate::config::ResponseCandidate {
    fn condition(&self) -> Option<&str> {
        self.condition.as_deref()
    }
}

/// Picks the response candidate for a request.
///
/// Candidates are split into defaults and conditionals, both keeping their
/// declared order. Conditionals are evaluated in order and the first that
/// holds wins; evaluation stops there. Otherwise the first default is used,
/// and when there is none, the last candidate of the whole list.
pub fn select<'a, T, D, E>(
    candidates: &'a [T],
    is_default: D,
    mut evaluate: E,
) -> Option<Selection<'a, T>>
where
    T: Conditional,
    D: Fn(Option<&str>) -> bool,
    E: FnMut(&str) -> bool,
{
    let (defaults, conditionals): (Vec<&T>, Vec<&T>) = candidates
        .iter()
        .partition(|candidate| is_default(candidate.condition()));

    for candidate in conditionals {
        let Some(expression) = candidate.condition() else {
            continue;
        };
        if evaluate(expression) {
            return Some(Selection {
                candidate,
                kind: SelectionKind::Condition,
            });
        }
    }

    if let Some(candidate) = defaults.first() {
        return Some(Selection {
            candidate,
            kind: SelectionKind::Default,
        });
    }

    candidates.last().map(|candidate| Selection {
        candidate,
        kind: SelectionKind::Fallback,
    })
}
