//! Réduction par propagation de croyances (peeling)
//!
//! Les équations (projections des paquets sur les chunks réels) sont
//! indexées par degré. Un degré 1 résout son chunk immédiatement ;
//! sinon, dès qu'un ensemble de chunks est strictement inclus dans un
//! autre, le sur-ensemble est réduit par XOR, ce qui abaisse son degré
//! et peut déclencher une cascade via la file de travail. Pas d'état
//! d'échec : l'absence de progrès signifie seulement qu'il faut plus de
//! paquets.

use std::collections::{BTreeMap, BTreeSet, VecDeque};

use crate::error::{FountainError, Result};
use crate::packet::Packet;

/// Équation de réduction : ensemble de chunks réels + payload replié
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Equation {
    pub used_chunks: BTreeSet<usize>,
    pub payload: Vec<u8>,
}

impl Equation {
    pub fn new(used_chunks: BTreeSet<usize>, payload: Vec<u8>) -> Self {
        Self {
            used_chunks,
            payload,
        }
    }

    /// Projection d'un paquet déjà ramené aux chunks réels
    pub fn from_packet(packet: &Packet) -> Self {
        Self {
            used_chunks: packet.used_chunks.clone(),
            payload: packet.payload.clone(),
        }
    }

    /// Équation sans payload, pour le pseudo-décodage côté encodeur
    /// (seule la structure compte, le XOR des octets est superflu)
    pub fn pseudo(used_chunks: BTreeSet<usize>) -> Self {
        Self {
            used_chunks,
            payload: Vec::new(),
        }
    }

    pub fn degree(&self) -> usize {
        self.used_chunks.len()
    }

    /// Réduction par différence symétrique + XOR des payloads
    /// (involutive : appliquée deux fois, restaure l'équation)
    fn xor_and_remove(&mut self, other: &Equation) {
        for index in &other.used_chunks {
            if !self.used_chunks.remove(index) {
                self.used_chunks.insert(*index);
            }
        }
        for (dst, src) in self.payload.iter_mut().zip(&other.payload) {
            *dst ^= src;
        }
    }
}

/// Réducteur par propagation de croyances
pub struct BeliefReducer {
    number_of_chunks: usize,
    equations: Vec<Equation>,
    /// degré -> indices d'équations de ce degré
    by_degree: BTreeMap<usize, BTreeSet<usize>>,
    queue: VecDeque<usize>,
    /// chunk résolu -> payload
    decoded: BTreeMap<usize, Vec<u8>>,
}

impl BeliefReducer {
    pub fn new(number_of_chunks: usize) -> Self {
        Self {
            number_of_chunks,
            equations: Vec::new(),
            by_degree: BTreeMap::new(),
            queue: VecDeque::new(),
            decoded: BTreeMap::new(),
        }
    }

    /// Insère une équation et réduit jusqu'au point fixe
    ///
    /// Retourne vrai dès que les N chunks sont résolus. Un degré
    /// supérieur à N signale une configuration encodeur/décodeur
    /// incompatible et abandonne la session.
    pub fn insert(&mut self, equation: Equation) -> Result<bool> {
        if equation.degree() > self.number_of_chunks {
            return Err(FountainError::InconsistentState(format!(
                "degré {} > {} chunks",
                equation.degree(),
                self.number_of_chunks
            )));
        }
        if equation.degree() == 0 {
            return Ok(self.is_decoded());
        }
        let index = self.equations.len();
        self.equations.push(equation);
        self.register(index);
        self.queue.push_back(index);
        while let Some(next) = self.queue.pop_front() {
            if self.reduce_all(next) {
                break;
            }
        }
        Ok(self.is_decoded())
    }

    fn register(&mut self, index: usize) {
        let degree = self.equations[index].degree();
        self.by_degree.entry(degree).or_default().insert(index);
        if degree == 1 {
            let chunk = *self.equations[index]
                .used_chunks
                .iter()
                .next()
                .expect("degré 1");
            if !self.decoded.contains_key(&chunk) {
                let payload = self.equations[index].payload.clone();
                self.decoded.insert(chunk, payload);
            }
        }
    }

    fn unregister(&mut self, index: usize) {
        let degree = self.equations[index].degree();
        if let Some(bucket) = self.by_degree.get_mut(&degree) {
            bucket.remove(&index);
            if bucket.is_empty() {
                self.by_degree.remove(&degree);
            }
        }
    }

    /// Réduit `target` par `operand` (operand strictement inclus),
    /// réindexe et remet en file pour cascade
    fn reduce_by(&mut self, target: usize, operand: &Equation) -> bool {
        self.unregister(target);
        self.equations[target].xor_and_remove(operand);
        self.register(target);
        if self.is_decoded() {
            return true;
        }
        self.queue.push_back(target);
        false
    }

    /// Compare l'équation aux degrés supérieurs puis inférieurs,
    /// en réduisant à chaque inclusion stricte
    fn reduce_all(&mut self, index: usize) -> bool {
        // réduire les sur-ensembles de degré supérieur par cette équation
        let my_degree = self.equations[index].degree();
        let supersets: Vec<usize> = self
            .by_degree
            .range(my_degree + 1..)
            .flat_map(|(_, bucket)| bucket.iter().copied())
            .filter(|other| {
                self.equations[index]
                    .used_chunks
                    .is_subset(&self.equations[*other].used_chunks)
            })
            .collect();
        for other in supersets {
            let operand = self.equations[index].clone();
            // l'inclusion peut avoir été cassée par une réduction précédente
            if operand.used_chunks.is_subset(&self.equations[other].used_chunks)
                && operand.degree() < self.equations[other].degree()
                && self.reduce_by(other, &operand)
            {
                return true;
            }
        }
        // réduire cette équation par les sous-ensembles de degré inférieur
        loop {
            let my_degree = self.equations[index].degree();
            let subset = self
                .by_degree
                .range(..my_degree)
                .flat_map(|(_, bucket)| bucket.iter().copied())
                .find(|other| {
                    *other != index
                        && self.equations[*other]
                            .used_chunks
                            .is_subset(&self.equations[index].used_chunks)
                });
            let Some(other) = subset else {
                break;
            };
            let operand = self.equations[other].clone();
            if self.reduce_by(index, &operand) {
                return true;
            }
        }
        self.is_decoded()
    }

    /// Vrai une fois exactement N chunks distincts résolus
    pub fn is_decoded(&self) -> bool {
        self.decoded.len() == self.number_of_chunks
    }

    /// Nombre de chunks résolus à ce stade
    pub fn solved_count(&self) -> usize {
        self.decoded.len()
    }

    pub fn number_of_chunks(&self) -> usize {
        self.number_of_chunks
    }

    /// Chunks résolus, indexés par position
    pub fn decoded(&self) -> &BTreeMap<usize, Vec<u8>> {
        &self.decoded
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn eq(used: &[usize], payload: &[u8]) -> Equation {
        Equation::new(used.iter().copied().collect(), payload.to_vec())
    }

    fn xor(a: &[u8], b: &[u8]) -> Vec<u8> {
        a.iter().zip(b).map(|(x, y)| x ^ y).collect()
    }

    #[test]
    fn test_degree_one_resolves_immediately() {
        let mut reducer = BeliefReducer::new(2);
        assert!(!reducer.insert(eq(&[0], b"AAAA")).unwrap());
        assert_eq!(reducer.solved_count(), 1);
        assert!(reducer.insert(eq(&[1], b"BBBB")).unwrap());
        assert_eq!(reducer.decoded()[&0], b"AAAA");
        assert_eq!(reducer.decoded()[&1], b"BBBB");
    }

    #[test]
    fn test_peeling_scenario_forward() {
        // scénario de référence : {0,1}, {1}, {2,3}, {3} dans cet ordre
        let mut reducer = BeliefReducer::new(4);
        assert!(!reducer
            .insert(eq(&[0, 1], &xor(b"AAAA", b"BBBB")))
            .unwrap());
        assert!(!reducer.insert(eq(&[1], b"BBBB")).unwrap());
        // le paquet {0,1} a été réduit en {0}
        assert_eq!(reducer.solved_count(), 2);
        assert_eq!(reducer.decoded()[&0], b"AAAA");
        assert!(!reducer
            .insert(eq(&[2, 3], &xor(b"CCCC", b"DDDD")))
            .unwrap());
        assert!(reducer.insert(eq(&[3], b"DDDD")).unwrap());
        assert_eq!(reducer.decoded()[&2], b"CCCC");
        assert!(reducer.is_decoded());
    }

    #[test]
    fn test_peeling_scenario_reverse() {
        // les mêmes paquets dans l'ordre inverse : même ensemble résolu
        let mut reducer = BeliefReducer::new(4);
        assert!(!reducer.insert(eq(&[3], b"DDDD")).unwrap());
        assert!(!reducer
            .insert(eq(&[2, 3], &xor(b"CCCC", b"DDDD")))
            .unwrap());
        assert_eq!(reducer.decoded()[&2], b"CCCC");
        assert!(!reducer.insert(eq(&[1], b"BBBB")).unwrap());
        assert!(reducer
            .insert(eq(&[0, 1], &xor(b"AAAA", b"BBBB")))
            .unwrap());
        assert_eq!(reducer.decoded()[&0], b"AAAA");
        assert_eq!(reducer.decoded()[&3], b"DDDD");
    }

    #[test]
    fn test_cascade_through_chain() {
        let c0 = b"aaaa";
        let c1 = b"bbbb";
        let c2 = b"cccc";
        let mut reducer = BeliefReducer::new(3);
        assert!(!reducer.insert(eq(&[0, 1], &xor(c0, c1))).unwrap());
        // {0,1} ⊂ {0,1,2} : le sur-ensemble est immédiatement réduit en {2}
        let p012 = xor(&xor(c0, c1), c2);
        assert!(!reducer.insert(eq(&[0, 1, 2], &p012)).unwrap());
        assert_eq!(reducer.solved_count(), 1);
        assert_eq!(reducer.decoded()[&2], c2);
        // un seul degré 1 déroule le reste de la chaîne
        assert!(reducer.insert(eq(&[0], c0)).unwrap());
        assert_eq!(reducer.decoded()[&1], c1);
    }

    #[test]
    fn test_duplicate_packets_are_harmless() {
        let mut reducer = BeliefReducer::new(2);
        reducer.insert(eq(&[0, 1], &[3, 3])).unwrap();
        reducer.insert(eq(&[0, 1], &[3, 3])).unwrap();
        assert_eq!(reducer.solved_count(), 0);
        assert!(reducer.insert(eq(&[0], &[1, 1])).unwrap());
        assert_eq!(reducer.decoded()[&1], vec![2, 2]);
    }

    #[test]
    fn test_degree_above_n_is_inconsistent() {
        let mut reducer = BeliefReducer::new(2);
        let err = reducer.insert(eq(&[0, 1, 2], &[0])).unwrap_err();
        assert!(matches!(err, FountainError::InconsistentState(_)));
    }

    #[test]
    fn test_pseudo_mode_tracks_structure_only() {
        let mut reducer = BeliefReducer::new(3);
        let used = |v: &[usize]| v.iter().copied().collect::<BTreeSet<_>>();
        reducer.insert(Equation::pseudo(used(&[0, 2]))).unwrap();
        reducer.insert(Equation::pseudo(used(&[2]))).unwrap();
        assert_eq!(reducer.solved_count(), 2);
        assert!(reducer.insert(Equation::pseudo(used(&[1]))).unwrap());
    }
}
