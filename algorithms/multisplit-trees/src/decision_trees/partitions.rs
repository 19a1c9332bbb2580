/// Lazily enumerates the set partitions of `0..n`
///
/// Elements are placed from last to first. Each partial partition is extended by inserting the
/// next element at the front of every existing block in turn, and finally by opening a new block
/// in front of all others. New blocks are only opened while fewer than `max_blocks` exist.
///
/// The first partition yielded is always the one with a single block.
pub(crate) struct SetPartitions {
    n: usize,
    max_blocks: usize,
    /// partial partitions still to be extended, with the number of placed elements
    stack: Vec<(usize, Vec<Vec<usize>>)>,
}

impl SetPartitions {
    pub fn new(n: usize, max_blocks: Option<usize>) -> Self {
        let stack = if n == 0 {
            Vec::new()
        } else {
            vec![(1, vec![vec![n - 1]])]
        };

        SetPartitions {
            n,
            max_blocks: max_blocks.unwrap_or(n),
            stack,
        }
    }
}

impl Iterator for SetPartitions {
    type Item = Vec<Vec<usize>>;

    fn next(&mut self) -> Option<Self::Item> {
        while let Some((placed, blocks)) = self.stack.pop() {
            if placed == self.n {
                return Some(blocks);
            }

            let element = self.n - 1 - placed;

            // pushed in reverse, so that inserting into the first block is explored first
            if blocks.len() < self.max_blocks {
                let mut extended = Vec::with_capacity(blocks.len() + 1);
                extended.push(vec![element]);
                extended.extend(blocks.iter().cloned());
                self.stack.push((placed + 1, extended));
            }
            for idx in (0..blocks.len()).rev() {
                let mut extended = blocks.clone();
                extended[idx].insert(0, element);
                self.stack.push((placed + 1, extended));
            }
        }

        None
    }
}

#[cfg(test)]
mod tests {
    use super::SetPartitions;

    #[test]
    fn three_elements_in_order() {
        let partitions = SetPartitions::new(3, None).collect::<Vec<_>>();

        assert_eq!(
            partitions,
            vec![
                vec![vec![0, 1, 2]],
                vec![vec![0], vec![1, 2]],
                vec![vec![0, 1], vec![2]],
                vec![vec![1], vec![0, 2]],
                vec![vec![0], vec![1], vec![2]],
            ]
        );
    }

    #[test]
    fn bell_numbers() {
        let bell = [1, 1, 2, 5, 15, 52, 203, 877];

        assert_eq!(SetPartitions::new(0, None).count(), 0);
        for (n, expected) in bell.iter().enumerate().skip(1) {
            assert_eq!(SetPartitions::new(n, None).count(), *expected);
        }
    }

    #[test]
    fn every_partition_covers_all_elements_once() {
        for partition in SetPartitions::new(5, None) {
            let mut elements = partition.concat();
            elements.sort_unstable();

            assert_eq!(elements, vec![0, 1, 2, 3, 4]);
            assert!(partition.iter().all(|block| !block.is_empty()));
        }
    }

    #[test]
    fn limits_the_number_of_blocks() {
        let partitions = SetPartitions::new(3, Some(2)).collect::<Vec<_>>();

        assert_eq!(partitions.len(), 4);
        assert!(partitions.iter().all(|x| x.len() <= 2));

        // Stirling numbers of the second kind: S(5,1) + S(5,2) = 1 + 15
        assert_eq!(SetPartitions::new(5, Some(2)).count(), 16);
    }
}
