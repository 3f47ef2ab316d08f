//! Élimination de Gauss avec pivot partiel sur GF(2)
//!
//! Matrice booléenne A (lignes = paquets réduits, colonnes = chunks
//! inconnus) doublée d'une matrice d'octets b (payloads). L'addition de
//! GF(2) est le XOR, le pivot est la première ligne portant un bit dans
//! la colonne courante. Les lignes s'ajoutent de façon incrémentale et
//! sont tamponnées jusqu'à la prochaine résolution ; résoudre deux fois
//! la même matrice accumulée donne le même result_mapping.

use crate::error::{FountainError, Result};

pub struct Gepp {
    /// Matrice de coefficients
    a: Vec<Vec<bool>>,
    /// Matrice parallèle des payloads
    b: Vec<Vec<u8>>,
    /// Ligne -> ordre d'insertion du paquet, permuté par les pivots
    packet_mapping: Vec<usize>,
    /// Lignes en attente d'insertion
    tmp_a: Vec<Vec<bool>>,
    tmp_b: Vec<Vec<u8>>,
    /// Colonne -> ligne qui la résout, None sinon
    result_mapping: Vec<Option<usize>>,
    columns: usize,
}

impl Gepp {
    pub fn new(columns: usize) -> Self {
        Self {
            a: Vec::new(),
            b: Vec::new(),
            packet_mapping: Vec::new(),
            tmp_a: Vec::new(),
            tmp_b: Vec::new(),
            result_mapping: vec![None; columns],
            columns,
        }
    }

    /// Ajoute une équation (ligne booléenne + payload), tamponnée
    /// jusqu'à la prochaine résolution
    pub fn add_row(&mut self, row: Vec<bool>, data: Vec<u8>) -> Result<()> {
        if row.len() != self.columns {
            return Err(FountainError::InconsistentState(format!(
                "ligne de {} colonnes dans une matrice de {}",
                row.len(),
                self.columns
            )));
        }
        if let Some(first) = self.b.first().or(self.tmp_b.first()) {
            if first.len() != data.len() {
                return Err(FountainError::InconsistentState(format!(
                    "payload de {} octets, {} attendus",
                    data.len(),
                    first.len()
                )));
            }
        }
        self.tmp_a.push(row);
        self.tmp_b.push(data);
        Ok(())
    }

    /// Nombre de lignes, lignes tamponnées comprises
    pub fn rows(&self) -> usize {
        self.a.len() + self.tmp_a.len()
    }

    pub fn columns(&self) -> usize {
        self.columns
    }

    /// Le système a au moins autant d'équations que d'inconnues
    pub fn is_potentially_solvable(&self) -> bool {
        self.rows() >= self.columns
    }

    fn insert_tmp(&mut self) {
        for (row, data) in self.tmp_a.drain(..).zip(self.tmp_b.drain(..)) {
            self.packet_mapping.push(self.a.len());
            self.a.push(row);
            self.b.push(data);
        }
    }

    /// Résout le système accumulé
    ///
    /// En mode partiel, le déficit de lignes est comblé par des lignes
    /// entièrement fausses plutôt que d'échouer : les colonnes non
    /// résolues restent sans mapping. Retourne vrai si toutes les
    /// colonnes sont résolues.
    pub fn solve(&mut self, partial: bool) -> Result<bool> {
        if !(self.is_potentially_solvable() || partial) {
            return Ok(false);
        }
        self.insert_tmp();
        if self.a.is_empty() {
            return Ok(false);
        }
        if partial && self.a.len() < self.columns {
            let payload_len = self.b[0].len();
            let deficit = self.columns - self.a.len();
            for _ in 0..deficit {
                self.packet_mapping.push(self.a.len());
                self.a.push(vec![false; self.columns]);
                self.b.push(vec![0u8; payload_len]);
            }
        }
        self.elimination();
        self.generate_result_mapping();
        Ok(self.is_solved())
    }

    fn xor_rows(&mut self, target: usize, source: usize, from_column: usize) {
        debug_assert_ne!(target, source);
        // scission sûre des deux emprunts de ligne
        let (low, high) = if target < source {
            let (l, h) = self.a.split_at_mut(source);
            (&mut l[target], &h[0])
        } else {
            let (l, h) = self.a.split_at_mut(target);
            (&mut h[0], &l[source])
        };
        for (dst, src) in low[from_column..].iter_mut().zip(&high[from_column..]) {
            *dst ^= *src;
        }
        let (low, high) = if target < source {
            let (l, h) = self.b.split_at_mut(source);
            (&mut l[target], &h[0])
        } else {
            let (l, h) = self.b.split_at_mut(target);
            (&mut h[0], &l[source])
        };
        for (dst, src) in low.iter_mut().zip(high.iter()) {
            *dst ^= *src;
        }
    }

    /// Élimination avant (avec pivot partiel) puis arrière
    fn elimination(&mut self) {
        let n = self.a.len();
        let m = self.columns;
        for k in 0..m.min(n) {
            // pivot : première ligne de k..n portant un bit en colonne k
            let Some(pivot) = (k..n).find(|row| self.a[*row][k]) else {
                continue;
            };
            if pivot != k {
                self.a.swap(k, pivot);
                self.b.swap(k, pivot);
                self.packet_mapping.swap(k, pivot);
            }
            for row in k + 1..n {
                if self.a[row][k] {
                    self.xor_rows(row, k, k);
                }
            }
        }
        // élimination arrière, de la dernière colonne vers la première
        for k in (0..m.min(n)).rev() {
            for row in (0..n).rev() {
                if row != k && self.a[row][k] {
                    self.xor_rows(row, k, k);
                }
            }
        }
    }

    /// Colonne -> ligne résolvante (ligne à exactement un bit)
    fn generate_result_mapping(&mut self) {
        self.result_mapping = vec![None; self.columns];
        for (row_index, row) in self.a.iter().enumerate() {
            let mut bits = row.iter().enumerate().filter(|(_, set)| **set);
            if let (Some((column, _)), None) = (bits.next(), bits.next()) {
                self.result_mapping[column] = Some(row_index);
            }
        }
    }

    /// Vrai si chaque colonne a une ligne résolvante
    pub fn is_solved(&self) -> bool {
        self.result_mapping.iter().all(Option::is_some)
    }

    /// Nombre de colonnes résolues
    pub fn solved_count(&self) -> usize {
        self.result_mapping.iter().filter(|r| r.is_some()).count()
    }

    pub fn result_mapping(&self) -> &[Option<usize>] {
        &self.result_mapping
    }

    /// Payload de la ligne donnée (après résolution : contenu du chunk)
    pub fn row_data(&self, row: usize) -> &[u8] {
        &self.b[row]
    }

    /// Ordre d'insertion du paquet porté par chaque ligne
    pub fn packet_mapping(&self) -> &[usize] {
        &self.packet_mapping
    }
}
